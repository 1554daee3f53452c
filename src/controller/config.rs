use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;
use crate::topology::types::Node;

/// Reads the seed configuration file: one node per line as
/// `<name> <host> <port>`.
///
/// Duplicate names are logged and skipped; malformed lines (including blank
/// ones) reject the whole file.
pub fn load_seed_nodes(path: impl AsRef<Path>) -> Result<Vec<Node>, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    parse_seed_nodes(&text)
}

pub fn parse_seed_nodes(text: &str) -> Result<Vec<Node>, ConfigError> {
    let mut nodes = Vec::new();
    let mut names = HashSet::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        if tokens.len() != 3 {
            return Err(ConfigError::Malformed {
                line,
                found: tokens.len(),
                content: raw.to_string(),
            });
        }

        let port: u16 = tokens[2].parse().map_err(|_| ConfigError::Port {
            line,
            value: tokens[2].to_string(),
        })?;

        if !names.insert(tokens[0].to_string()) {
            tracing::warn!(
                "{} already exists, server names must be unique; skipping line {}",
                tokens[0],
                line
            );
            continue;
        }

        let node = Node::new(tokens[0], tokens[1], port);
        tracing::info!("{} added to node pool", node);
        nodes.push(node);
    }

    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn duplicate_names_are_skipped_with_a_warning() {
        let text = "server1 10.0.0.1 5000\nserver2 10.0.0.2 5000\nserver1 10.0.0.3 5000\n";
        let nodes = parse_seed_nodes(text).unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].name, "server1");
        assert_eq!(nodes[0].host, "10.0.0.1");
        assert_eq!(nodes[1].name, "server2");
        assert_eq!(nodes[1].host, "10.0.0.2");
    }

    #[test]
    fn short_line_is_rejected_with_token_count() {
        let err = parse_seed_nodes("server1 10.0.0.1\n").unwrap_err();
        assert!(err.to_string().contains("expected 3 tokens, got 2"));
    }

    #[test]
    fn blank_line_is_rejected() {
        let err = parse_seed_nodes("server1 10.0.0.1 5000\n\nserver2 10.0.0.2 5000\n").unwrap_err();
        assert!(err.to_string().contains("expected 3 tokens, got 0"));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = parse_seed_nodes("server1 10.0.0.1 port\n").unwrap_err();
        assert!(matches!(err, ConfigError::Port { line: 1, .. }));
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server1 127.0.0.1 5000").unwrap();
        writeln!(file, "server2 127.0.0.1 5001").unwrap();
        file.flush().unwrap();

        let nodes = load_seed_nodes(file.path()).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].port, 5001);
    }
}
