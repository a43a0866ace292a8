pub mod catalog;
pub mod conjunction;
