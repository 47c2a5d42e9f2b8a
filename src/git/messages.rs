//! Commit message templates for auto-commits.

use chrono::Local;

/// Render a commit message template, substituting `{date}` and `{name}`.
pub fn render_template(template: &str, name: &str) -> String {
    template
        .replace("{date}", &format_date())
        .replace("{name}", name)
}

/// Today's date on the civil calendar, `YYYY-MM-DD`.
pub fn format_date() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_placeholders() {
        let message = render_template("sync {name} on {date}", "dotfiles");
        assert!(message.starts_with("sync dotfiles on "));
        assert!(!message.contains('{'));
    }

    #[test]
    fn test_render_without_placeholders() {
        assert_eq!(render_template("plain message", "x"), "plain message");
    }

    #[test]
    fn test_format_date_shape() {
        let date = format_date();
        assert_eq!(date.len(), 10);
        assert_eq!(date.as_bytes()[4], b'-');
        assert_eq!(date.as_bytes()[7], b'-');
    }
}
