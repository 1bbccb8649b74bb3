pub mod sheets;
pub mod userinfo;

pub use sheets::SheetsAdapter;
pub use userinfo::UserInfoAdapter;
