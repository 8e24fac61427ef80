//! Syntax checks for operator input.

/// A dotted-quad IPv4 address or a fully qualified domain name.
pub fn is_valid_host(input: &str) -> bool {
    is_ipv4(input) || is_fqdn(input)
}

fn is_ipv4(input: &str) -> bool {
    let octets: Vec<&str> = input.split('.').collect();
    octets.len() == 4
        && octets.iter().all(|o| {
            (1..=3).contains(&o.len())
                && o.bytes().all(|b| b.is_ascii_digit())
                && o.parse::<u8>().is_ok()
        })
}

fn is_fqdn(input: &str) -> bool {
    if !(4..=253).contains(&input.len()) {
        return false;
    }
    let labels: Vec<&str> = input.split('.').collect();
    let Some((tld, hosts)) = labels.split_last() else {
        return false;
    };
    !hosts.is_empty()
        && hosts.iter().all(|l| is_host_label(l))
        && (2..=63).contains(&tld.len())
        && tld.bytes().all(|b| b.is_ascii_alphabetic())
}

fn is_host_label(label: &str) -> bool {
    (1..=63).contains(&label.len())
        && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        && !label.starts_with('-')
        && !label.ends_with('-')
}

/// 3 to 24 word characters or hyphens.
pub fn is_valid_username(input: &str) -> bool {
    (3..=24).contains(&input.chars().count())
        && input
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_addresses() {
        assert!(is_valid_host("10.0.0.1"));
        assert!(is_valid_host("255.255.255.255"));
        assert!(is_valid_host("192.168.001.1"));
        assert!(!is_valid_host("256.1.1.1"));
        assert!(!is_valid_host("10.0.0"));
        assert!(!is_valid_host("10.0.0.1.5"));
    }

    #[test]
    fn domain_names() {
        assert!(is_valid_host("fw.example.com"));
        assert!(is_valid_host("pano-01.corp.example.org"));
        assert!(!is_valid_host("localhost"));
        assert!(!is_valid_host("-bad.example.com"));
        assert!(!is_valid_host("bad-.example.com"));
        assert!(!is_valid_host("host.example.c0m"));
        assert!(!is_valid_host("a..com"));
        assert!(!is_valid_host(""));
    }

    #[test]
    fn usernames() {
        assert!(is_valid_username("admin"));
        assert!(is_valid_username("net_ops-2"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("a".repeat(25).as_str()));
        assert!(!is_valid_username("bad user"));
    }
}
