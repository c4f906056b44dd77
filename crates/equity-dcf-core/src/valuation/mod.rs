pub mod dcf;
pub mod growth;
pub mod intrinsic;
pub mod projection;
