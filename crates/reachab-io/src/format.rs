use clap::ValueEnum;

/// Input format for a `GraphInput`, either named explicitly or detected from
/// content (mirroring the teacher's `detect()` content-sniffing convention:
/// variants are tried in declaration order, most specific first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    Csv,
    Json,
}

/// Detect the input format from content heuristics. Returns `None` if
/// neither matches.
pub fn detect(input: &str) -> Option<InputFormat> {
    InputFormat::value_variants()
        .iter()
        .find(|fmt| fmt.matches_content(input))
        .copied()
}

impl InputFormat {
    fn matches_content(&self, input: &str) -> bool {
        match self {
            Self::Json => is_json(input),
            Self::Csv => is_csv(input),
        }
    }
}

/// First non-blank character is `{`.
fn is_json(input: &str) -> bool {
    first_nonblank(input).starts_with('{')
}

/// Anything that isn't JSON is assumed to be the CSV matrix format; CSV has
/// no reliable self-describing header to sniff for.
fn is_csv(_input: &str) -> bool {
    true
}

fn first_nonblank(input: &str) -> &str {
    input
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}
