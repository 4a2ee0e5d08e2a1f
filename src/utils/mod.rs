pub mod process;
pub mod text;
