use std::io::{self, BufRead, Write};

use crate::domain::Credentials;
use crate::error::ExportError;

const USER_ID_HELP: &str = "Please enter your user id. You can find this in the browser with glitch.com open, by opening your dev tools and running:\n\n  JSON.parse(localStorage.cachedUser).id\n";
const TOKEN_HELP: &str = "Please enter your persistent token. You can find this in the browser with glitch.com open, by opening your dev tools and running:\n\n  JSON.parse(localStorage.cachedUser).persistentToken\n";

pub trait Prompter {
    fn explain(&mut self, text: &str);
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;
    fn read_secret(&mut self, prompt: &str) -> io::Result<String>;
}

/// Prompts on `output` and reads answers from `input`.
pub struct StreamPrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> StreamPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Prompter for StreamPrompter<R, W> {
    fn explain(&mut self, text: &str) {
        let _ = writeln!(self.output, "\n{text}");
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line)
    }

    fn read_secret(&mut self, prompt: &str) -> io::Result<String> {
        self.read_line(prompt)
    }
}

/// Interactive prompter on the controlling terminal. Prompts go to stderr so
/// stdout stays clean for `--json`; the token is read without echo.
pub struct StdinPrompter {
    inner: StreamPrompter<io::StdinLock<'static>, io::Stderr>,
}

impl StdinPrompter {
    pub fn new() -> Self {
        Self {
            inner: StreamPrompter::new(io::stdin().lock(), io::stderr()),
        }
    }
}

impl Default for StdinPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for StdinPrompter {
    fn explain(&mut self, text: &str) {
        self.inner.explain(text);
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        self.inner.read_line(prompt)
    }

    fn read_secret(&mut self, prompt: &str) -> io::Result<String> {
        rpassword::prompt_password(prompt)
    }
}

/// Uses the given values where present and prompts for the rest.
pub fn resolve(
    user_id: Option<String>,
    token: Option<String>,
    prompter: &mut dyn Prompter,
) -> Result<Credentials, ExportError> {
    let user_id = match user_id {
        Some(value) => value,
        None => {
            prompter.explain(USER_ID_HELP);
            prompter
                .read_line("Your user id: ")
                .map_err(|err| ExportError::Prompt {
                    what: "user id",
                    message: err.to_string(),
                })?
        }
    };

    let token = match token {
        Some(value) => value,
        None => {
            prompter.explain(TOKEN_HELP);
            prompter
                .read_secret("Your persistent token: ")
                .map_err(|err| ExportError::Prompt {
                    what: "persistent token",
                    message: err.to_string(),
                })?
        }
    };

    Ok(Credentials::new(&user_id, &token))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted {
        lines: Vec<String>,
        explained: usize,
    }

    impl Prompter for Scripted {
        fn explain(&mut self, _text: &str) {
            self.explained += 1;
        }

        fn read_line(&mut self, _prompt: &str) -> io::Result<String> {
            Ok(self.lines.remove(0))
        }

        fn read_secret(&mut self, _prompt: &str) -> io::Result<String> {
            Ok(self.lines.remove(0))
        }
    }

    #[test]
    fn arguments_skip_prompts() {
        let mut prompter = Scripted {
            lines: Vec::new(),
            explained: 0,
        };
        let creds = resolve(
            Some("42".to_string()),
            Some("'tok'".to_string()),
            &mut prompter,
        )
        .unwrap();
        assert_eq!(creds.user_id(), "42");
        assert_eq!(creds.token(), "tok");
        assert_eq!(prompter.explained, 0);
    }

    #[test]
    fn missing_values_are_prompted() {
        let mut prompter = Scripted {
            lines: vec!["42\n".to_string(), "\"tok\"".to_string()],
            explained: 0,
        };
        let creds = resolve(None, None, &mut prompter).unwrap();
        assert_eq!(creds.user_id(), "42");
        assert_eq!(creds.token(), "tok");
        assert_eq!(prompter.explained, 2);
    }

    #[test]
    fn stream_prompts_go_to_the_given_writer() {
        let input = io::Cursor::new(b"42\n'tok'\n".to_vec());
        let mut prompter = StreamPrompter::new(input, Vec::new());
        let creds = resolve(None, None, &mut prompter).unwrap();
        assert_eq!(creds.user_id(), "42");
        assert_eq!(creds.token(), "tok");

        let written = String::from_utf8(prompter.into_output()).unwrap();
        assert!(written.contains("localStorage.cachedUser).id"));
        assert!(written.contains("Your user id: "));
        assert!(written.contains("Your persistent token: "));
    }
}
