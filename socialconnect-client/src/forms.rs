use serde::Deserialize;
use validator::Validate;

/// What the signup page submits.
///
/// The password is required by the form but never stored or compared; the
/// backend keeps no credentials.
#[derive(Debug, Validate, Deserialize)]
pub struct SignupForm {
    #[validate(length(min = 2, max = 128))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 32))]
    pub phone: String,
    #[validate(length(min = 1, max = 64))]
    pub password: String,
}

/// What the login page submits: a single identifier matched against
/// username, email, and phone.
#[derive(Debug, Validate, Deserialize)]
pub struct LoginForm {
    #[validate(length(min = 1, max = 128))]
    pub identifier: String,
    #[validate(length(min = 1, max = 64))]
    pub password: String,
}

#[derive(Debug, Validate, Deserialize)]
pub struct ContactForm {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 4096))]
    pub message: String,
}
