// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive REPL (Read-Eval-Print Loop) for spacey-cjs.
//!
//! Input runs as a script located in the working directory, so `require`
//! resolves relative paths and `node_modules` from there.

use owo_colors::OwoColorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Config, Editor, Helper};
use spacey_require::ModuleResolver;
use spacey_require::module_system::path;
use spacey_script::lexer::{Scanner, Token, TokenKind};
use spacey_script::{Runtime, Value};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// REPL configuration constants
const HISTORY_FILE: &str = ".spacey_cjs_history";
const MAX_HISTORY_SIZE: usize = 1000;

/// REPL commands that can be executed with a dot prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Exit,
    Clear,
    Load,
    Cache,
}

impl ReplCommand {
    /// Parse a REPL command from input string
    pub fn parse(input: &str) -> Option<(Self, Option<&str>)> {
        let input = input.trim();
        if !input.starts_with('.') {
            return None;
        }

        let parts: Vec<&str> = input[1..].splitn(2, char::is_whitespace).collect();
        let cmd = parts.first()?.to_lowercase();
        let arg = parts.get(1).copied();

        match cmd.as_str() {
            "help" | "h" | "?" => Some((ReplCommand::Help, arg)),
            "exit" | "quit" | "q" => Some((ReplCommand::Exit, arg)),
            "clear" | "cls" => Some((ReplCommand::Clear, arg)),
            "load" | "l" => Some((ReplCommand::Load, arg)),
            "cache" => Some((ReplCommand::Cache, arg)),
            _ => None,
        }
    }

    /// Get all available commands for help/completion
    pub fn all_commands() -> &'static [(&'static str, &'static str)] {
        &[
            (".help", "Show this help message"),
            (".exit", "Exit the REPL"),
            (".clear", "Clear the screen"),
            (".load <file>", "Run a file as a script in this session"),
            (".cache", "Show how many modules the registry has compiled"),
        ]
    }
}

/// Globals and members offered for completion
const GLOBALS: &[&str] = &[
    "console",
    "console.log",
    "console.error",
    "console.warn",
    "Error",
    "JSON",
    "JSON.parse",
    "JSON.stringify",
    "globalThis",
    "module.exports",
    "process",
    "process.argv",
    "process.env",
    "process.platform",
    "require",
    "RangeError",
    "TypeError",
];

/// Identifiers highlighted as built-ins
const BUILTINS: &[&str] = &[
    "console", "Error", "JSON", "globalThis", "module", "exports", "process", "require",
    "RangeError", "ReferenceError", "SyntaxError", "TypeError",
];

/// Completion, hints, highlighting and multi-line validation for rustyline.
///
/// Highlighting and validation run the interpreter's own scanner over the
/// line, so they agree with what will actually be parsed.
struct SpaceyHelper {
    candidates: Vec<String>,
}

impl SpaceyHelper {
    fn new() -> Self {
        let keywords = [
            "break", "catch", "const", "continue", "else", "false", "finally", "for", "function",
            "if", "let", "new", "null", "return", "this", "throw", "true", "try", "typeof",
            "undefined", "var", "void", "while",
        ];
        let modules = ["'node:console'", "'node:process'", "'node:util'"];
        let commands = ReplCommand::all_commands()
            .iter()
            .map(|(usage, _)| usage.split_whitespace().next().unwrap_or(*usage));

        let candidates = keywords
            .into_iter()
            .chain(GLOBALS.iter().copied())
            .chain(modules)
            .chain(commands)
            .map(String::from)
            .collect();
        Self { candidates }
    }

    fn matching<'a>(&'a self, word: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.candidates
            .iter()
            .filter(move |candidate| candidate.len() > word.len() && candidate.starts_with(word))
    }
}

/// Byte offset where the word ending at `pos` starts. Dots and quotes are
/// part of a word so `process.en` and `'node:u` complete.
fn word_start(line: &str, pos: usize) -> usize {
    line[..pos]
        .rfind(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '.' | ':' | '\'')))
        .map(|i| i + 1)
        .unwrap_or(0)
}

impl Completer for SpaceyHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = word_start(line, pos);
        let word = &line[start..pos];
        if word.is_empty() {
            return Ok((pos, Vec::new()));
        }

        let pairs = self
            .matching(word)
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate[word.len()..].to_string(),
            })
            .collect();
        Ok((pos, pairs))
    }
}

impl Hinter for SpaceyHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let word = &line[word_start(line, pos)..];
        if word.len() < 2 {
            return None;
        }
        self.matching(word)
            .next()
            .map(|candidate| (&candidate[word.len()..]).dimmed().to_string())
    }
}

impl Highlighter for SpaceyHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.trim_start().starts_with('.') && ReplCommand::parse(line).is_some() {
            return Cow::Owned(line.magenta().to_string());
        }

        let mut out = String::with_capacity(line.len() * 2);
        let mut written = 0;
        for token in tokens(line) {
            // Whitespace and comments between tokens pass through uncoloured
            out.push_str(&line[written..token.span.start]);
            out.push_str(&paint(&token.kind, &line[token.span.start..token.span.end]));
            written = token.span.end;
        }
        out.push_str(&line[written..]);
        Cow::Owned(out)
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Borrowed(hint)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn paint(kind: &TokenKind, text: &str) -> String {
    match kind {
        TokenKind::True | TokenKind::False | TokenKind::Null | TokenKind::This => text.blue().to_string(),
        _ if kind.keyword_text().is_some() => text.magenta().bold().to_string(),
        TokenKind::Number(_) => text.yellow().to_string(),
        TokenKind::String(_) => text.green().to_string(),
        TokenKind::Identifier(name) if name == "undefined" || name == "NaN" || name == "Infinity" => {
            text.blue().to_string()
        }
        TokenKind::Identifier(name) if BUILTINS.contains(&name.as_str()) => text.cyan().to_string(),
        TokenKind::Identifier(_) => text.to_string(),
        TokenKind::LeftParen
        | TokenKind::RightParen
        | TokenKind::LeftBracket
        | TokenKind::RightBracket
        | TokenKind::LeftBrace
        | TokenKind::RightBrace => text.yellow().to_string(),
        TokenKind::Invalid(_) => text.red().to_string(),
        _ => text.cyan().to_string(),
    }
}

/// Every token of `source` up to end of input.
fn tokens(source: &str) -> Vec<Token> {
    let mut scanner = Scanner::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token();
        let end = token.span.end;
        if matches!(token.kind, TokenKind::Eof) {
            break;
        }
        let stuck = tokens.last().is_some_and(|last: &Token| last.span.end >= end);
        tokens.push(token);
        if stuck || end >= source.len() {
            break;
        }
    }
    tokens
}

impl Helper for SpaceyHelper {}

impl Validator for SpaceyHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        if is_complete(ctx.input()) {
            Ok(ValidationResult::Valid(None))
        } else {
            Ok(ValidationResult::Incomplete)
        }
    }
}

/// Whether `input` can be submitted: every bracket is closed and the last
/// token does not need a right-hand side. Mismatched brackets count as
/// complete so the parser reports them.
fn is_complete(input: &str) -> bool {
    let tokens = tokens(input);
    let mut open = Vec::new();
    for token in &tokens {
        match token.kind {
            TokenKind::LeftParen => open.push(TokenKind::RightParen),
            TokenKind::LeftBracket => open.push(TokenKind::RightBracket),
            TokenKind::LeftBrace => open.push(TokenKind::RightBrace),
            TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                if open.pop().as_ref() != Some(&token.kind) {
                    return true;
                }
            }
            _ => {}
        }
    }
    if !open.is_empty() {
        return false;
    }

    !matches!(
        tokens.last().map(|token| &token.kind),
        Some(
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Equal
                | TokenKind::PlusEqual
                | TokenKind::MinusEqual
                | TokenKind::Comma
                | TokenKind::Dot
                | TokenKind::Question
                | TokenKind::Colon
                | TokenKind::AmpersandAmpersand
                | TokenKind::PipePipe
                | TokenKind::QuestionQuestion
        )
    )
}

/// The interactive REPL
pub struct Repl {
    runtime: Runtime,
    resolver: ModuleResolver,
    /// Module path input is evaluated as
    script_name: String,
    editor: Editor<SpaceyHelper, DefaultHistory>,
    history_path: PathBuf,
}

impl Repl {
    /// Create a REPL over an enabled runtime
    pub fn new(runtime: Runtime, resolver: ModuleResolver, cwd: &Path) -> rustyline::Result<Self> {
        let config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(MAX_HISTORY_SIZE)?
            .auto_add_history(true)
            .build();

        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(SpaceyHelper::new()));

        // Determine history file path
        let history_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("spacey")
            .join(HISTORY_FILE);

        // Create parent directory if it doesn't exist
        if let Some(parent) = history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        // Load history
        let _ = editor.load_history(&history_path);

        Ok(Self {
            runtime,
            resolver,
            script_name: path::join(&path::from_host(cwd), "[repl]"),
            editor,
            history_path,
        })
    }

    /// Run the REPL main loop
    pub fn run(&mut self) -> rustyline::Result<()> {
        self.print_banner();

        loop {
            let prompt = self.format_prompt();

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();

                    if trimmed.is_empty() {
                        continue;
                    }

                    // Check for REPL commands
                    if let Some((cmd, arg)) = ReplCommand::parse(trimmed) {
                        match self.execute_command(cmd, arg) {
                            CommandResult::Continue => continue,
                            CommandResult::Exit => break,
                        }
                    }

                    let name = self.script_name.clone();
                    self.eval_and_print(&name, trimmed);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".dimmed());
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "^D".dimmed());
                    break;
                }
                Err(err) => {
                    eprintln!("{}: {:?}", "Error".red().bold(), err);
                    break;
                }
            }
        }

        // Save history
        let _ = self.editor.save_history(&self.history_path);
        Ok(())
    }

    fn print_banner(&self) {
        let version = env!("CARGO_PKG_VERSION");
        println!(
            "{} {} {}",
            "spacey-cjs".bright_cyan().bold(),
            "v".dimmed(),
            version.bright_yellow()
        );
        println!(
            "{} {} {}",
            "Type".dimmed(),
            ".help".cyan(),
            "for available commands".dimmed()
        );
    }

    fn format_prompt(&self) -> String {
        format!("{} ", ">".bright_green().bold())
    }

    fn execute_command(&mut self, cmd: ReplCommand, arg: Option<&str>) -> CommandResult {
        match cmd {
            ReplCommand::Help => {
                self.print_help();
                CommandResult::Continue
            }
            ReplCommand::Exit => CommandResult::Exit,
            ReplCommand::Clear => {
                print!("\x1B[2J\x1B[H");
                CommandResult::Continue
            }
            ReplCommand::Load => {
                if let Some(path) = arg {
                    self.load_file(path.trim());
                } else {
                    eprintln!(
                        "{}: {} {}",
                        "Error".red().bold(),
                        ".load".cyan(),
                        "requires a file path".dimmed()
                    );
                }
                CommandResult::Continue
            }
            ReplCommand::Cache => {
                println!(
                    "{} {}",
                    self.resolver.registry().compiled_count().to_string().yellow(),
                    "compiled modules".dimmed()
                );
                CommandResult::Continue
            }
        }
    }

    fn print_help(&self) {
        println!();
        println!("{}", "REPL Commands:".white().bold());
        println!();

        for (cmd, desc) in ReplCommand::all_commands() {
            println!("  {:16} {}", cmd.cyan(), desc.dimmed());
        }

        println!();
        println!("{}", "Keyboard Shortcuts:".white().bold());
        println!();
        println!(
            "  {:16} {}",
            "Ctrl+C".yellow(),
            "Cancel current input".dimmed()
        );
        println!("  {:16} {}", "Ctrl+D".yellow(), "Exit REPL".dimmed());
        println!("  {:16} {}", "Tab".yellow(), "Autocomplete".dimmed());
        println!("  {:16} {}", "↑/↓".yellow(), "Navigate history".dimmed());
        println!();
    }

    /// Runs a file as a top-level script so its globals stay in the session.
    fn load_file(&mut self, file: &str) {
        let host_path = std::path::absolute(file).unwrap_or_else(|_| PathBuf::from(file));
        match std::fs::read_to_string(&host_path) {
            Ok(source) => {
                let name = path::clean(&path::from_host(&host_path));
                self.eval_and_print(&name, &source);
            }
            Err(err) => eprintln!("{}: {}: {}", "Error".red().bold(), host_path.display(), err),
        }
    }

    fn eval_and_print(&mut self, name: &str, input: &str) {
        match self.resolver.run_script(&mut self.runtime, name, input) {
            Ok(value) => {
                println!("{}", format_value(&value));
            }
            Err(e) => {
                crate::print_error(&e);
            }
        }
    }
}

/// Result of executing a REPL command
enum CommandResult {
    Continue,
    Exit,
}

/// Format a JavaScript value for display with syntax coloring
fn format_value(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".blue().dimmed().to_string(),
        Value::Null => "null".blue().to_string(),
        Value::Boolean(b) => b.to_string().yellow().to_string(),
        Value::Number(_) => value.to_display_string().yellow().to_string(),
        Value::String(s) => format!("'{}'", s).green().to_string(),
        Value::Object(object) if object.is_callable() => {
            format!("[Function: {}]", object.get("name")).magenta().to_string()
        }
        Value::Object(object) if object.is_error() => value.to_display_string().red().to_string(),
        Value::Object(_) => match spacey_script::builtins::value_to_json(value) {
            Ok(Some(json)) => json.to_string().cyan().to_string(),
            _ => "[object Object]".cyan().to_string(),
        },
    }
}
