/// Abstraction over user-facing output.
///
/// Command code reports progress through this trait instead of calling
/// `println!`/`eprintln!` directly, so `--quiet` can silence it.
pub trait UserOutput: Send + Sync {
    /// Informational status message (e.g., "Watching ./svc for changes")
    fn status(&self, message: &str);

    /// Success message (e.g., "helloworld@main is running")
    fn success(&self, message: &str);

    fn warning(&self, message: &str);
}

/// Standard CLI output. Messages go to stderr so stdout stays with the
/// service.
pub struct CliOutput;

impl UserOutput for CliOutput {
    fn status(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn success(&self, message: &str) {
        eprintln!("\x1b[32m{}\x1b[0m", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("\x1b[33m{}\x1b[0m", message);
    }
}

/// Suppresses all output.
pub struct QuietOutput;

impl UserOutput for QuietOutput {
    fn status(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
}
