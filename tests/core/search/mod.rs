mod test_dismax;
mod test_end_to_end;
mod test_reload;
