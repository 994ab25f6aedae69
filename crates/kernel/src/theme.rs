//! Page and email rendering via Tera.

use anyhow::{Context, Result};
use tera::Tera;

/// Theme engine holding the compiled template set.
///
/// Templates are embedded at compile time so the binary has no runtime
/// file dependency.
pub struct ThemeEngine {
    tera: Tera,
}

impl ThemeEngine {
    /// Create the engine with the built-in template set.
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (
                "contact/input.html",
                include_str!("../templates/contact/input.html"),
            ),
            (
                "contact/confirm.html",
                include_str!("../templates/contact/confirm.html"),
            ),
            (
                "contact/complete.html",
                include_str!("../templates/contact/complete.html"),
            ),
            (
                "email/admin_notification.txt",
                include_str!("../templates/email/admin_notification.txt"),
            ),
            (
                "email/auto_reply.txt",
                include_str!("../templates/email/auto_reply.txt"),
            ),
        ])
        .context("failed to compile built-in templates")?;

        Ok(Self { tera })
    }

    /// Access the underlying Tera instance.
    pub fn tera(&self) -> &Tera {
        &self.tera
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn built_in_templates_compile() {
        let engine = ThemeEngine::new().unwrap();
        let names: Vec<_> = engine.tera().get_template_names().collect();

        assert!(names.contains(&"contact/input.html"));
        assert!(names.contains(&"contact/confirm.html"));
        assert!(names.contains(&"contact/complete.html"));
        assert!(names.contains(&"email/admin_notification.txt"));
        assert!(names.contains(&"email/auto_reply.txt"));
    }

    #[test]
    fn input_template_renders_with_empty_context() {
        let engine = ThemeEngine::new().unwrap();
        let mut context = tera::Context::new();
        context.insert("csrf_token", "tok");
        context.insert("site_key", "key");
        context.insert("fields", &std::collections::HashMap::<String, String>::new());
        context.insert(
            "errors",
            &std::collections::HashMap::<String, String>::new(),
        );
        context.insert("flash_errors", &Vec::<String>::new());

        let html = engine.tera().render("contact/input.html", &context).unwrap();
        assert!(html.contains(r#"name="_token" value="tok""#));
    }
}
