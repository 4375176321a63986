pub mod page_reader;
