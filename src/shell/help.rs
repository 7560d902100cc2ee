//! Normalization of indented documentation strings for `help`.

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Number of leading characters shared by the first non-blank line and every
/// non-blank line after it, counting only whitespace.
fn common_indent(lines: &[&str]) -> usize {
    let Some(first) = lines.iter().position(|line| !is_blank(line)) else {
        return 0;
    };
    let others: Vec<Vec<char>> = lines[first + 1..]
        .iter()
        .filter(|line| !is_blank(line))
        .map(|line| line.chars().collect())
        .collect();

    let mut prefix = 0;
    for (i, c) in lines[first].chars().enumerate() {
        prefix = i;
        if !c.is_whitespace() {
            break;
        }
        if others.iter().any(|other| other.get(i) != Some(&c)) {
            break;
        }
    }
    prefix
}

/// Strips the common indentation from every non-blank line of `doc`.
///
/// Blank and whitespace-only lines are kept exactly as they are.
pub fn format_doc(doc: &str) -> String {
    let lines: Vec<&str> = doc.split('\n').collect();
    let prefix = common_indent(&lines);

    lines
        .iter()
        .map(|line| {
            if is_blank(line) {
                (*line).to_string()
            } else {
                line.chars().skip(prefix).collect()
            }
        })
        .collect::<Vec<String>>()
        .join("\n")
}
