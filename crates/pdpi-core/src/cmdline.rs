//! Command-line shaping for the strategy executable
//!
//! Strategy arguments arrive as a single line. Flags that point at list or
//! payload files may carry paths with spaces once placeholders are expanded;
//! those flags are quoted so the tool receives them as one argument.

/// Flags whose value is a file path and must stay in one argument
pub const QUOTED_FLAG_PREFIXES: [&str; 4] = [
    "--hostlist=",
    "--ipset=",
    "--dpi-desync-fake-quic=",
    "--dpi-desync-fake-tls=",
];

/// Quote recognized flags whose value contains spaces
///
/// The line is cut into segments, each starting at a word that begins with
/// `--`; words that do not start a flag belong to the preceding segment.
/// Segments are joined back with single spaces.
///
/// ```
/// use pdpi_core::cmdline::quote_arguments;
///
/// assert_eq!(
///     quote_arguments(r"--hostlist=C:\a b\list.txt --other=1"),
///     r#""--hostlist=C:\a b\list.txt" --other=1"#,
/// );
/// ```
pub fn quote_arguments(line: &str) -> String {
    flag_segments(line)
        .into_iter()
        .map(|segment| {
            if needs_quotes(&segment) {
                format!("\"{segment}\"")
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn needs_quotes(segment: &str) -> bool {
    segment.contains(' ')
        && QUOTED_FLAG_PREFIXES
            .iter()
            .any(|prefix| segment.starts_with(prefix))
}

fn flag_segments(line: &str) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    for word in line.split_whitespace() {
        match segments.last_mut() {
            Some(current) if !word.starts_with("--") => {
                current.push(' ');
                current.push_str(word);
            }
            _ => segments.push(word.to_string()),
        }
    }
    segments
}

/// Split a command line into arguments, honoring double quotes
///
/// Quotes group words and are removed; there is no escape character, so
/// Windows paths with backslashes survive unchanged.
pub fn split_arguments(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if has_token {
        args.push(current);
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_hostlist_with_space() {
        assert_eq!(
            quote_arguments(r"--hostlist=C:\a b\list.txt --other=1"),
            r#""--hostlist=C:\a b\list.txt" --other=1"#
        );
    }

    #[test]
    fn test_quote_all_recognized_prefixes() {
        let line = r"--ipset=C:\My Lists\ip.txt --dpi-desync-fake-quic=C:\P F\quic.bin --dpi-desync-fake-tls=C:\P F\tls.bin";
        assert_eq!(
            quote_arguments(line),
            r#""--ipset=C:\My Lists\ip.txt" "--dpi-desync-fake-quic=C:\P F\quic.bin" "--dpi-desync-fake-tls=C:\P F\tls.bin""#
        );
    }

    #[test]
    fn test_no_quotes_without_spaces() {
        let line = r"--wf-tcp=80,443 --hostlist=C:\lists\general.txt --dpi-desync=fake";
        assert_eq!(quote_arguments(line), line);
    }

    #[test]
    fn test_unrecognized_flag_not_quoted() {
        assert_eq!(
            quote_arguments(r"--hostlist-exclude=C:\a b\x.txt --new"),
            r"--hostlist-exclude=C:\a b\x.txt --new"
        );
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(quote_arguments("  --a=1   --b=2  "), "--a=1 --b=2");
        assert_eq!(quote_arguments(""), "");
    }

    #[test]
    fn test_split_plain() {
        assert_eq!(split_arguments("--a=1  --b=2"), vec!["--a=1", "--b=2"]);
        assert!(split_arguments("   ").is_empty());
    }

    #[test]
    fn test_split_quoted() {
        assert_eq!(
            split_arguments(r#""--hostlist=C:\a b\list.txt" --other=1"#),
            vec![r"--hostlist=C:\a b\list.txt", "--other=1"]
        );
    }

    #[test]
    fn test_split_empty_quotes() {
        assert_eq!(split_arguments(r#"--x "" --y"#), vec!["--x", "", "--y"]);
    }

    #[test]
    fn test_quote_then_split_keeps_path_together() {
        let quoted = quote_arguments("--ipset=/srv/my lists/ip.txt --dpi-desync=fake");
        assert_eq!(
            split_arguments(&quoted),
            vec!["--ipset=/srv/my lists/ip.txt", "--dpi-desync=fake"]
        );
    }
}
