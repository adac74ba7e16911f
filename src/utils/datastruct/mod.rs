pub mod csr;
pub mod vector;
