//! Schema composition.
//!
//! The canonical schema is authored as ordered fragments under
//! `schema/fragments/NN_name.sql`. Composing validates them and concatenates
//! them into a single generated artifact at `schema/.generated/schema.sql`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const FRAGMENTS_DIR: &str = "schema/fragments";
pub const GENERATED_DIR: &str = "schema/.generated";
pub const SCHEMA_FILE: &str = "schema.sql";

const GENERATED_HEADER: &str = "\
-- @generated by `cargo xtask db compose`. Do not edit by hand.
-- Source: schema/fragments/*.sql, concatenated in file-name order.
";

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("No schema fragments found in {0}")]
    NoFragments(PathBuf),
    #[error("Invalid fragment file name {0}: expected NN_name.sql")]
    InvalidName(String),
    #[error("Fragment {0} is empty")]
    EmptyFragment(String),
    #[error("Fragment {fragment} has an unbalanced parenthesis at line {line}")]
    UnbalancedParentheses { fragment: String, line: usize },
    #[error("Fragment {fragment} has an unterminated {construct} starting at line {line}")]
    Unterminated {
        fragment: String,
        construct: &'static str,
        line: usize,
    },
    #[error("Table {table} is defined in both {first} and {second}")]
    DuplicateTable {
        table: String,
        first: String,
        second: String,
    },
    #[error("Table {table} in {fragment} declares constraint {constraint} twice")]
    DuplicateConstraint {
        fragment: String,
        table: String,
        constraint: String,
    },
    #[error("Fragment {fragment} references undefined table {table}")]
    UnknownReference { fragment: String, table: String },
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

pub type Result<T> = std::result::Result<T, ComposeError>;

/// One schema source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub name: String,
    pub sql: String,
}

/// Result of a successful compose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedSchema {
    pub path: PathBuf,
    pub fragments: Vec<String>,
    pub tables: Vec<String>,
}

/// Path of the generated schema relative to `root`.
pub fn schema_path(root: &Path) -> PathBuf {
    root.join(GENERATED_DIR).join(SCHEMA_FILE)
}

/// Reads, validates and concatenates `<root>/schema/fragments/*.sql` into
/// `<root>/schema/.generated/schema.sql`. Nothing is written when any
/// fragment is invalid.
pub fn compose_schema(root: &Path) -> Result<ComposedSchema> {
    let fragments = load_fragments(&root.join(FRAGMENTS_DIR))?;
    let tables = validate_fragments(&fragments)?;
    let rendered = render_schema(&fragments);

    let generated_dir = root.join(GENERATED_DIR);
    fs::create_dir_all(&generated_dir).map_err(|source| ComposeError::Write {
        path: generated_dir.clone(),
        source,
    })?;

    let path = schema_path(root);
    fs::write(&path, rendered).map_err(|source| ComposeError::Write {
        path: path.clone(),
        source,
    })?;

    tracing::info!(
        path = %path.display(),
        fragments = fragments.len(),
        tables = tables.len(),
        "Composed schema"
    );

    Ok(ComposedSchema {
        path,
        fragments: fragments.into_iter().map(|f| f.name).collect(),
        tables,
    })
}

/// Loads every `*.sql` file in `dir`, sorted by file name.
pub fn load_fragments(dir: &Path) -> Result<Vec<Fragment>> {
    let read_err = |source: io::Error| ComposeError::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".sql") && entry.path().is_file() {
            names.push(name);
        }
    }
    names.sort();

    if names.is_empty() {
        return Err(ComposeError::NoFragments(dir.to_path_buf()));
    }

    names
        .into_iter()
        .map(|name| {
            let path = dir.join(&name);
            let sql = fs::read_to_string(&path)
                .map_err(|source| ComposeError::Read { path, source })?;
            Ok(Fragment { name, sql })
        })
        .collect()
}

/// Pure function: validates fragments and returns the defined table names
/// in definition order.
pub fn validate_fragments(fragments: &[Fragment]) -> Result<Vec<String>> {
    if fragments.is_empty() {
        return Err(ComposeError::NoFragments(PathBuf::from(FRAGMENTS_DIR)));
    }

    let mut defined: BTreeMap<String, &str> = BTreeMap::new();
    let mut tables = Vec::new();
    let mut references = Vec::new();

    for fragment in fragments {
        if !is_valid_fragment_name(&fragment.name) {
            return Err(ComposeError::InvalidName(fragment.name.clone()));
        }

        let code = strip_comments_and_literals(&fragment.sql).map_err(|(construct, line)| {
            ComposeError::Unterminated {
                fragment: fragment.name.clone(),
                construct,
                line,
            }
        })?;

        if code.trim().is_empty() {
            return Err(ComposeError::EmptyFragment(fragment.name.clone()));
        }

        if let Some(line) = unbalanced_parenthesis_line(&code) {
            return Err(ComposeError::UnbalancedParentheses {
                fragment: fragment.name.clone(),
                line,
            });
        }

        check_constraint_names(&fragment.name, &code)?;

        let scan = scan_tables(&code);
        for table in scan.created {
            if let Some(first) = defined.get(&table) {
                return Err(ComposeError::DuplicateTable {
                    table,
                    first: first.to_string(),
                    second: fragment.name.clone(),
                });
            }
            defined.insert(table.clone(), &fragment.name);
            tables.push(table);
        }
        references.extend(scan.referenced.into_iter().map(|t| (t, &fragment.name)));
    }

    for (table, fragment) in references {
        if !defined.contains_key(&table) {
            return Err(ComposeError::UnknownReference {
                fragment: fragment.clone(),
                table,
            });
        }
    }

    Ok(tables)
}

/// Pure function: header followed by each fragment in order.
pub fn render_schema(fragments: &[Fragment]) -> String {
    let mut out = String::from(GENERATED_HEADER);
    for fragment in fragments {
        out.push_str("\n-- fragment: ");
        out.push_str(&fragment.name);
        out.push('\n');
        out.push_str(fragment.sql.trim());
        out.push('\n');
    }
    out
}

/// `NN_name.sql`: two digits, an underscore, then lowercase words.
pub fn is_valid_fragment_name(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(".sql") else {
        return false;
    };
    let bytes = stem.as_bytes();
    bytes.len() > 3
        && bytes[0].is_ascii_digit()
        && bytes[1].is_ascii_digit()
        && bytes[2] == b'_'
        && bytes[3..]
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'_')
}

/// Blanks out comments, string literals and dollar-quoted bodies, keeping
/// newlines so line numbers survive. Fails with the construct name and
/// starting line when one is never closed.
fn strip_comments_and_literals(sql: &str) -> std::result::Result<String, (&'static str, usize)> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut line = 1;
    let mut i = 0;

    let blank = |c: char| if c == '\n' { '\n' } else { ' ' };

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c == '-' && next == Some('-') {
            while i < chars.len() && chars[i] != '\n' {
                out.push(' ');
                i += 1;
            }
            continue;
        }

        if c == '/' && next == Some('*') {
            let start = line;
            out.push_str("  ");
            i += 2;
            loop {
                match (chars.get(i), chars.get(i + 1)) {
                    (Some('*'), Some('/')) => {
                        out.push_str("  ");
                        i += 2;
                        break;
                    }
                    (Some(&ch), _) => {
                        if ch == '\n' {
                            line += 1;
                        }
                        out.push(blank(ch));
                        i += 1;
                    }
                    (None, _) => return Err(("block comment", start)),
                }
            }
            continue;
        }

        if c == '\'' {
            let start = line;
            out.push(' ');
            i += 1;
            loop {
                match (chars.get(i), chars.get(i + 1)) {
                    (Some('\''), Some('\'')) => {
                        out.push_str("  ");
                        i += 2;
                    }
                    (Some('\''), _) => {
                        out.push(' ');
                        i += 1;
                        break;
                    }
                    (Some(&ch), _) => {
                        if ch == '\n' {
                            line += 1;
                        }
                        out.push(blank(ch));
                        i += 1;
                    }
                    (None, _) => return Err(("string literal", start)),
                }
            }
            continue;
        }

        if c == '$' {
            if let Some(tag) = dollar_tag(&chars[i..]) {
                let start = line;
                let tag_len = tag.len();
                out.push_str(&" ".repeat(tag_len));
                i += tag_len;
                loop {
                    if i >= chars.len() {
                        return Err(("dollar-quoted body", start));
                    }
                    if chars[i..].starts_with(&tag) {
                        out.push_str(&" ".repeat(tag_len));
                        i += tag_len;
                        break;
                    }
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    out.push(blank(chars[i]));
                    i += 1;
                }
                continue;
            }
        }

        if c == '\n' {
            line += 1;
        }
        out.push(c);
        i += 1;
    }

    Ok(out)
}

/// Returns `$tag$` (including both dollars) when `chars` starts with one.
/// Positional parameters like `$1` are not tags.
fn dollar_tag(chars: &[char]) -> Option<Vec<char>> {
    let mut end = 1;
    while let Some(&c) = chars.get(end) {
        if c == '$' {
            return Some(chars[..=end].to_vec());
        }
        let valid = if end == 1 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        };
        if !valid {
            return None;
        }
        end += 1;
    }
    None
}

/// Line of the first unmatched parenthesis, if any.
fn unbalanced_parenthesis_line(code: &str) -> Option<usize> {
    let mut open_lines = Vec::new();
    for (index, text) in code.lines().enumerate() {
        let line = index + 1;
        for c in text.chars() {
            match c {
                '(' => open_lines.push(line),
                ')' => {
                    if open_lines.pop().is_none() {
                        return Some(line);
                    }
                }
                _ => {}
            }
        }
    }
    open_lines.first().copied()
}

#[derive(Debug, Default, PartialEq, Eq)]
struct TableScan {
    created: Vec<String>,
    referenced: Vec<String>,
}

fn scan_tables(code: &str) -> TableScan {
    let words: Vec<&str> = code
        .split(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | ',' | ';'))
        .filter(|w| !w.is_empty())
        .collect();

    let mut scan = TableScan::default();
    let mut i = 0;
    while i < words.len() {
        let word = words[i];
        if word.eq_ignore_ascii_case("CREATE") {
            let mut j = i + 1;
            if words.get(j).is_some_and(|w| w.eq_ignore_ascii_case("UNLOGGED")) {
                j += 1;
            }
            if words.get(j).is_some_and(|w| w.eq_ignore_ascii_case("TABLE")) {
                j += 1;
                if words.get(j).is_some_and(|w| w.eq_ignore_ascii_case("IF")) {
                    j += 3;
                }
                if let Some(name) = words.get(j) {
                    scan.created.push(normalize_table_name(name));
                }
                i = j;
            }
        } else if word.eq_ignore_ascii_case("REFERENCES") {
            if let Some(name) = words.get(i + 1) {
                scan.referenced.push(normalize_table_name(name));
            }
        }
        i += 1;
    }
    scan
}

/// Rejects a table whose constraint names collide, counting the names
/// PostgreSQL generates for unnamed column constraints
/// (`<table>_pkey`, `<table>_<column>_key`, `_check`, `_fkey`).
fn check_constraint_names(fragment: &str, code: &str) -> Result<()> {
    for (table, names) in scan_constraints(code) {
        let mut seen = BTreeSet::new();
        for name in names {
            if !seen.insert(name.clone()) {
                return Err(ComposeError::DuplicateConstraint {
                    fragment: fragment.to_string(),
                    table,
                    constraint: name,
                });
            }
        }
    }
    Ok(())
}

/// Splits code into words, keeping `(`, `)`, `,` and `;` as their own tokens.
fn tokenize(code: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in code.char_indices() {
        let punct = matches!(c, '(' | ')' | ',' | ';');
        if c.is_whitespace() || punct {
            if let Some(s) = start.take() {
                tokens.push(&code[s..i]);
            }
            if punct {
                tokens.push(&code[i..i + 1]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(&code[s..]);
    }
    tokens
}

/// Returns the table name and the index of its opening parenthesis when a
/// `CREATE TABLE` statement starts at `i`.
fn create_table_at(tokens: &[&str], i: usize) -> Option<(String, usize)> {
    let is = |j: usize, word: &str| tokens.get(j).is_some_and(|t| t.eq_ignore_ascii_case(word));

    if !is(i, "CREATE") {
        return None;
    }
    let mut j = i + 1;
    if is(j, "UNLOGGED") {
        j += 1;
    }
    if !is(j, "TABLE") {
        return None;
    }
    j += 1;
    if is(j, "IF") {
        j += 3;
    }
    let name = tokens.get(j)?;
    (tokens.get(j + 1) == Some(&"(")).then(|| (normalize_table_name(name), j + 1))
}

/// Constraint names per created table, in declaration order.
fn scan_constraints(code: &str) -> Vec<(String, Vec<String>)> {
    let tokens = tokenize(code);
    let mut tables = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let Some((table, open)) = create_table_at(&tokens, i) else {
            i += 1;
            continue;
        };

        let mut names = Vec::new();
        let mut element = Vec::new();
        let mut depth = 0usize;
        let mut j = open;
        while j < tokens.len() {
            match tokens[j] {
                "(" => {
                    depth += 1;
                    if depth > 1 {
                        element.push("(");
                    }
                }
                ")" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        break;
                    }
                    element.push(")");
                }
                "," if depth == 1 => {
                    element_constraints(&table, &element, &mut names);
                    element.clear();
                }
                token => element.push(token),
            }
            j += 1;
        }
        element_constraints(&table, &element, &mut names);

        tables.push((table, names));
        i = j + 1;
    }
    tables
}

/// Constraint names declared by one column or table-constraint element.
fn element_constraints(table: &str, element: &[&str], names: &mut Vec<String>) {
    let mut depth = 0usize;
    let words: Vec<String> = element
        .iter()
        .filter_map(|token| match *token {
            "(" => {
                depth += 1;
                None
            }
            ")" => {
                depth = depth.saturating_sub(1);
                None
            }
            word if depth == 0 => Some(normalize_table_name(word)),
            _ => None,
        })
        .collect();

    let Some(first) = words.first() else {
        return;
    };
    let column = match first.as_str() {
        "constraint" | "primary" | "unique" | "check" | "foreign" | "exclude" | "like" => None,
        _ => Some(first.as_str()),
    };

    let mut named = false;
    let mut k = usize::from(column.is_some());
    while k < words.len() {
        match words[k].as_str() {
            "constraint" => {
                names.extend(words.get(k + 1).cloned());
                named = true;
                k += 2;
                continue;
            }
            keyword @ ("primary" | "unique" | "check" | "references") => {
                if !named {
                    let generated = match (keyword, column) {
                        ("primary", _) => Some(format!("{table}_pkey")),
                        ("unique", Some(column)) => Some(format!("{table}_{column}_key")),
                        ("check", Some(column)) => Some(format!("{table}_{column}_check")),
                        ("references", Some(column)) => Some(format!("{table}_{column}_fkey")),
                        _ => None,
                    };
                    names.extend(generated);
                }
                named = false;
            }
            _ => {}
        }
        k += 1;
    }
}

fn normalize_table_name(name: &str) -> String {
    let name = name.trim_matches('"').to_ascii_lowercase();
    match name.strip_prefix("public.") {
        Some(unqualified) => unqualified.trim_matches('"').to_string(),
        None => name,
    }
}
