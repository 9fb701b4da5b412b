pub mod gstr1;
pub mod gstr3b;

pub use gstr1::generate_gstr1_json;
pub use gstr3b::generate_gstr3b_json;
