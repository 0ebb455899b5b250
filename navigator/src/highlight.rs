//! Decides how many rows after the selected one belong to the same
//! semantic unit (a scalar entry, or a whole nested object/array block),
//! purely from indentation.

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_root_close(line: &str) -> bool {
    indentation(line) == 0 && line.trim() == "}"
}

/// Number of rows following `selected` that are highlighted along with it.
///
/// Rows at indent 0 are wrap continuations of the row above them (the
/// rendered document puts every entry at indent 2 or deeper), except the
/// root's closing brace.
pub fn next_lines_to_highlight<S: AsRef<str>>(lines: &[S], selected: usize) -> usize {
    let Some(current_line) = lines.get(selected) else {
        return 0;
    };
    if selected == 0 {
        return lines.len() - 1;
    }

    let rest = &lines[selected + 1..];
    let current = indentation(current_line.as_ref());
    if current == 0 {
        return rest
            .iter()
            .take_while(|line| {
                let line: &str = line.as_ref();
                indentation(line) == 0 && !is_root_close(line)
            })
            .count();
    }

    let mut count = 0;
    let mut rows = rest.iter();
    while let Some(line) = rows.next() {
        let line: &str = line.as_ref();
        let indent = indentation(line);
        if indent == 0 {
            if is_root_close(line) {
                break;
            }
            count += 1;
            continue;
        }
        if indent <= current {
            break;
        }

        // Nested block: runs through the row that closes it at our indent.
        count += 1;
        for line in rows.by_ref() {
            let line: &str = line.as_ref();
            let indent = indentation(line);
            if indent == 0 {
                if is_root_close(line) {
                    return count;
                }
                count += 1;
                continue;
            }
            if indent < current {
                return count;
            }
            count += 1;
            if indent == current {
                return count;
            }
        }
        return count;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rows(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    #[test]
    fn nested_object_includes_its_closing_brace() {
        let lines = rows("{\n  \"object\": {\n    \"nested\": \"x\"\n  }\n}");
        assert_eq!(next_lines_to_highlight(&lines, 1), 2);
    }

    #[test]
    fn opening_brace_selects_everything() {
        let lines = rows("{\n  \"a\": 1,\n  \"b\": 2\n}");
        assert_eq!(next_lines_to_highlight(&lines, 0), 3);
    }

    #[test]
    fn scalar_entries_stand_alone() {
        let lines = rows("{\n  \"a\": 1,\n  \"b\": 2\n}");
        assert_eq!(next_lines_to_highlight(&lines, 1), 0);
        assert_eq!(next_lines_to_highlight(&lines, 2), 0);
    }

    #[test]
    fn top_level_scalar_at_indent_zero() {
        let lines = vec!["\"a\": 1", "\"b\": 2"];
        assert_eq!(next_lines_to_highlight(&lines, 1), 0);
    }

    #[test]
    fn wrapped_continuations_are_included() {
        let lines = vec![
            "{",
            "  \"note\": \"a long",
            "value that wraps\",",
            "  \"n\": 1",
            "}",
        ];
        assert_eq!(next_lines_to_highlight(&lines, 1), 1);
        assert_eq!(next_lines_to_highlight(&lines, 2), 0);
    }

    #[test]
    fn arrays_and_deep_nesting() {
        let lines = rows(
            "{\n  \"list\": [\n    {\n      \"x\": 1\n    },\n    2\n  ],\n  \"after\": true\n}",
        );
        assert_eq!(next_lines_to_highlight(&lines, 1), 5);
        assert_eq!(next_lines_to_highlight(&lines, 2), 2);
        assert_eq!(next_lines_to_highlight(&lines, 5), 0);
        assert_eq!(next_lines_to_highlight(&lines, 7), 0);
    }

    #[test]
    fn closing_brace_and_out_of_range() {
        let lines = rows("{\n  \"a\": 1\n}");
        assert_eq!(next_lines_to_highlight(&lines, 2), 0);
        assert_eq!(next_lines_to_highlight(&lines, 9), 0);
        assert_eq!(next_lines_to_highlight::<&str>(&[], 0), 0);
    }
}
