pub mod capture;
pub mod decoder;
pub mod framer;
