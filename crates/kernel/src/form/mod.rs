//! Form handling: CSRF protection and declarative field validation.

pub mod csrf;
pub mod validate;

pub use csrf::{CSRF_COOKIE, CSRF_FIELD, CsrfError, generate_csrf_token, verify_csrf_token};
pub use validate::{Validation, validate_contact};
