// ranges.rs - Column and sequence index lists such as "{ 0, 2-5, 9 }"

/// Parse a comma separated list of indices and inclusive `a-b` ranges.
///
/// Surrounding braces are optional. The result is sorted and deduplicated.
pub fn parse_index_list(input: &str) -> Result<Vec<usize>, String> {
    let body = input.trim();
    let body = body
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(body);

    let mut indices = Vec::new();
    for item in body.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.split_once('-') {
            Some((start, end)) => {
                let start = parse_index(start, input)?;
                let end = parse_index(end, input)?;
                if start > end {
                    return Err(format!(
                        "Invalid range '{}' in '{}': start is after end",
                        item, input
                    ));
                }
                indices.extend(start..=end);
            }
            None => indices.push(parse_index(item, input)?),
        }
    }

    if indices.is_empty() {
        return Err(format!("Index list '{}' is empty", input));
    }

    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}

fn parse_index(value: &str, input: &str) -> Result<usize, String> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("Invalid index '{}' in '{}'", value.trim(), input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index_list() {
        assert_eq!(parse_index_list("{ 0, 2-5, 9 }").unwrap(), vec![0, 2, 3, 4, 5, 9]);
        assert_eq!(parse_index_list("7,3-4,4").unwrap(), vec![3, 4, 7]);
        assert_eq!(parse_index_list("12").unwrap(), vec![12]);
    }

    #[test]
    fn test_parse_index_list_errors() {
        assert!(parse_index_list("5-2").is_err());
        assert!(parse_index_list("a,3").is_err());
        assert!(parse_index_list("-3").is_err());
        assert!(parse_index_list("{}").is_err());
    }
}
