pub mod fs;
pub mod test;
