//! Interactive numbered menu, the default front end

use crate::console;
use crate::pipeline::Pipeline;
use crate::Result;
use std::fs;
use std::io::{BufRead, Write};

const MENU_ITEMS: [(&str, &str); 4] = [
    ("1", "Download proxies from API list"),
    ("2", "Convert raw proxy list"),
    ("3", "Run validation & distribution"),
    ("4", "Exit"),
];

const EXIT_CHOICE: &str = "4";

/// Line-based prompts over any reader/writer pair
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask until one of `choices` is entered; empty input or EOF picks `default`
    pub fn ask(&mut self, question: &str, choices: &[&str], default: &str) -> Result<String> {
        loop {
            write!(
                self.output,
                "{} [{}] ({}): ",
                question,
                choices.join("/"),
                default
            )?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Ok(default.to_string());
            }

            let answer = line.trim().to_lowercase();
            if answer.is_empty() {
                return Ok(default.to_string());
            }
            if choices.contains(&answer.as_str()) {
                return Ok(answer);
            }
            writeln!(self.output, "Please select one of the available options")?;
        }
    }

    pub fn confirm(&mut self, question: &str, default_yes: bool) -> Result<bool> {
        let default = if default_yes { "y" } else { "n" };
        Ok(self.ask(question, &["y", "n"], default)? == "y")
    }

    pub fn pause(&mut self) -> Result<()> {
        write!(self.output, "\nPress Enter to return...")?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(())
    }

    fn print_menu(&mut self) -> Result<()> {
        writeln!(self.output, "Main Menu")?;
        for (key, label) in MENU_ITEMS {
            writeln!(self.output, "  [{}] {}", key, label)?;
        }
        Ok(())
    }
}

/// Loop over the menu until the user exits
pub async fn run<R: BufRead, W: Write>(
    pipeline: &Pipeline,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    let choices: Vec<&str> = MENU_ITEMS.iter().map(|(key, _)| *key).collect();

    loop {
        console::header("ProxySync");
        prompter.print_menu()?;
        let choice = prompter.ask("Choose an option", &choices, EXIT_CHOICE)?;

        let outcome = match choice.as_str() {
            "1" => download(pipeline, prompter).await,
            "2" => pipeline.convert().map(|_| ()),
            "3" => {
                let distribute =
                    prompter.confirm("Distribute working proxies to all target paths?", true)?;
                pipeline.run(distribute, false).await.map(|_| ())
            }
            _ => {
                console::step("Goodbye!");
                return Ok(());
            }
        };

        if let Err(e) = outcome {
            console::error(&format!("{:#}", e));
        }
        prompter.pause()?;
    }
}

async fn download<R: BufRead, W: Write>(
    pipeline: &Pipeline,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    let proxylist = &pipeline.settings().files.proxylist;
    let has_data = fs::metadata(proxylist).map(|m| m.len() > 0).unwrap_or(false);
    if has_data {
        let question = format!(
            "'{}' already has data. Replace it with a fresh download?",
            proxylist.display()
        );
        if !prompter.confirm(&question, true)? {
            console::info("Cancelled, nothing downloaded.");
            return Ok(());
        }
    }

    pipeline.download().await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_ask_default_on_empty_line() {
        let mut p = prompter("\n");
        assert_eq!(p.ask("Pick", &["1", "2"], "2").unwrap(), "2");
    }

    #[test]
    fn test_ask_repeats_until_valid() {
        let mut p = prompter("9\n  1 \n");
        assert_eq!(p.ask("Pick", &["1", "2"], "2").unwrap(), "1");
        let shown = String::from_utf8(p.output).unwrap();
        assert!(shown.contains("Please select one of the available options"));
    }

    #[test]
    fn test_ask_eof_returns_default() {
        let mut p = prompter("");
        assert_eq!(p.ask("Pick", &["1", "4"], "4").unwrap(), "4");
    }

    #[test]
    fn test_confirm() {
        let mut p = prompter("N\n\n");
        assert!(!p.confirm("Sure?", true).unwrap());
        assert!(p.confirm("Sure?", true).unwrap());
    }

    #[tokio::test]
    async fn test_menu_exit() {
        let pipeline = Pipeline::new(Settings::default());
        let mut p = prompter("4\n");
        run(&pipeline, &mut p).await.unwrap();
        assert!(String::from_utf8(p.output).unwrap().contains("[3] Run validation"));
    }
}
