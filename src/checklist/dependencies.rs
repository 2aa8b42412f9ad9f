use std::collections::BTreeSet;

/// Canonical form used to compare package names: lowercase, with `-`, `_`
/// and `.` folded together.
pub fn normalize_package(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '_' | '.' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Package names declared in a pip-style dependency list.
pub fn declared_packages(content: &str) -> BTreeSet<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty() && !line.starts_with('-'))
        .filter_map(|line| {
            let end = line
                .find(|c: char| "=<>!~[;@ \t".contains(c))
                .unwrap_or(line.len());
            let name = &line[..end];
            (!name.is_empty()).then(|| normalize_package(name))
        })
        .collect()
}

/// `wanted` packages not declared in `content`, in input order.
pub fn missing_packages<'a>(content: &str, wanted: &'a [String]) -> Vec<&'a str> {
    let declared = declared_packages(content);
    wanted
        .iter()
        .filter(|p| !declared.contains(&normalize_package(p)))
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specifiers_extras_and_markers_are_stripped() {
        let declared = declared_packages(
            "# bot deps\n\
             discord.py>=2.3.0\n\
             python-dotenv==1.0.0  # env\n\
             aiohttp[speedups] ; python_version >= '3.8'\n\
             -r extra.txt\n\
             \n\
             PyNaCl\n",
        );
        let expected: BTreeSet<String> = ["discord-py", "python-dotenv", "aiohttp", "pynacl"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(declared, expected);
    }

    #[test]
    fn names_compare_loosely() {
        let wanted = vec!["Discord_Py".to_string(), "python-dotenv".to_string()];
        assert_eq!(missing_packages("discord.py\n", &wanted), vec!["python-dotenv"]);
        assert!(missing_packages("discord.py\npython_dotenv\n", &wanted).is_empty());
    }
}
