//! Line commands of the interactive dashboard.

use chrono::NaiveDate;

use crate::dates::FILTER_DATE_FORMAT;
use crate::shell::Event;

pub const HELP_TEXT: &str = r#"Commands:
  login <username> <password>   sign in
  logout                        sign out and forget the stored session
  from <YYYY-MM-DD | ->         set or clear the start date
  to <YYYY-MM-DD | ->           set or clear the end date
  customer [name]               filter by customer (no name clears)
  product [title]               filter by product (no title clears)
  page <n>                      select a result page
  search                        run the search with the current filters
  customers                     reload the customer list
  ingest                        pull new licenses from the source system
  export                        write every match to a CSV file
  dismiss                       hide the current message
  show                          redraw the screen
  help                          this text
  quit                          leave the dashboard
"#;

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Event(Event),
    Show,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Input>, String> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    let input = match command.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        "show" | "ls" => Input::Show,
        "login" => {
            let mut parts = rest.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(username), Some(password), None) => Input::Event(Event::LoginSubmitted {
                    username: username.to_string(),
                    password: password.to_string(),
                }),
                _ => return Err("usage: login <username> <password>".to_string()),
            }
        }
        "logout" => Input::Event(Event::LogoutRequested),
        "from" => Input::Event(Event::DateFromChanged(date_arg(rest)?)),
        "to" => Input::Event(Event::DateToChanged(date_arg(rest)?)),
        "customer" => Input::Event(Event::CustomerSelected(name_arg(rest))),
        "product" => Input::Event(Event::ProductSelected(name_arg(rest))),
        "page" => match rest.parse::<u32>() {
            Ok(page) if page > 0 => Input::Event(Event::PageChanged(page)),
            _ => return Err("usage: page <n>, n >= 1".to_string()),
        },
        "search" | "s" => Input::Event(Event::SearchRequested),
        "customers" => Input::Event(Event::CustomersRequested),
        "ingest" => Input::Event(Event::IngestRequested),
        "export" => Input::Event(Event::ExportRequested),
        "dismiss" => Input::Event(Event::BannerDismissed),
        other => return Err(format!("unknown command `{}`, type `help`", other)),
    };
    Ok(Some(input))
}

fn date_arg(value: &str) -> Result<Option<String>, String> {
    match value {
        "" | "-" => Ok(None),
        value => NaiveDate::parse_from_str(value, FILTER_DATE_FORMAT)
            .map(|d| Some(d.format(FILTER_DATE_FORMAT).to_string()))
            .map_err(|_| format!("`{}` is not a date (YYYY-MM-DD)", value)),
    }
}

fn name_arg(value: &str) -> Option<String> {
    match value {
        "" | "-" => None,
        value => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line() {
        assert_eq!(parse_command("   "), Ok(None));
    }

    #[test]
    fn test_login() {
        assert_eq!(
            parse_command("login alice s3cret"),
            Ok(Some(Input::Event(Event::LoginSubmitted {
                username: "alice".into(),
                password: "s3cret".into()
            })))
        );
        assert!(parse_command("login alice").is_err());
    }

    #[test]
    fn test_dates() {
        assert_eq!(
            parse_command("from 2025-01-05"),
            Ok(Some(Input::Event(Event::DateFromChanged(Some("2025-01-05".into())))))
        );
        assert_eq!(parse_command("to -"), Ok(Some(Input::Event(Event::DateToChanged(None)))));
        assert!(parse_command("from 05/01/2025").is_err());
    }

    #[test]
    fn test_names_keep_spaces() {
        assert_eq!(
            parse_command("customer Acme Industrial Ltd"),
            Ok(Some(Input::Event(Event::CustomerSelected(Some("Acme Industrial Ltd".into())))))
        );
        assert_eq!(parse_command("product"), Ok(Some(Input::Event(Event::ProductSelected(None)))));
    }

    #[test]
    fn test_page() {
        assert_eq!(parse_command("page 3"), Ok(Some(Input::Event(Event::PageChanged(3)))));
        assert!(parse_command("page 0").is_err());
        assert!(parse_command("page x").is_err());
    }

    #[test]
    fn test_keywords() {
        assert_eq!(parse_command("INGEST"), Ok(Some(Input::Event(Event::IngestRequested))));
        assert_eq!(parse_command("quit"), Ok(Some(Input::Quit)));
        assert!(parse_command("frobnicate").is_err());
    }
}
