mod test_build;
mod test_writer;
