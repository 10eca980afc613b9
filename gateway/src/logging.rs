//! Root logger construction, generalizing the teacher's `flux::logging::init`
//! (a hardcoded embedded TOML handed to `sloggers`) into a level/destination
//! pair that callers can override, while keeping the same
//! config-string-through-`serdeconv` plumbing.

use sloggers::Config;

/// Builds the root `slog::Logger`. `level` is one of sloggers' accepted
/// level strings (`"critical"`..`"trace"`); destination is always the
/// terminal on stderr, matching the teacher.
pub fn init(level: &str) -> slog::Logger {
    let toml = format!(
        r#"
type = "terminal"
level = "{level}"
destination = "stderr"
"#
    );

    let config: sloggers::LoggerConfig =
        serdeconv::from_toml_str(&toml).expect("static logging config template is always valid TOML");

    config.build_logger().expect("terminal logger construction cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_logger_at_debug_level() {
        let _log = init("debug");
    }
}
