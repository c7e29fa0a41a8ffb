pub mod password;
pub mod profile;
pub mod registration;
pub mod session;

pub use password::{change_password, confirm_forgot_password, forgot_password};
pub use profile::update_user_attributes;
pub use registration::{confirm_sign_up, resend_confirmation_code, sign_up};
pub use session::{introspect, login, refresh_token};
