use tracing::{debug, warn};

use crate::dependency::{PositionStrategy, ScenarioDependencies};
use crate::extract::error::ExtractError;
use crate::phase::{LifecycleKind, LifecycleMethod, Phase, PhaseScope};

/// Attributes that mark a function as a scenario step.
const STEP_MARKERS: &[&str] = &["step", "test"];

/// Result of scanning one scenario source file.
#[derive(Debug, Clone)]
pub struct ScannedScenario {
    pub dependencies: ScenarioDependencies,
    /// Setup/teardown methods in declaration order.
    pub lifecycle: Vec<LifecycleMethod>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Produce,
    Consume,
}

#[derive(Default)]
struct PendingAttributes {
    step: bool,
    kinds: Vec<LifecycleKind>,
    scope: Option<PhaseScope>,
}

impl PendingAttributes {
    fn is_lifecycle(&self) -> bool {
        !self.kinds.is_empty() || self.scope.is_some()
    }
}

/// A function whose body the scanner is inside of.
struct OpenMethod {
    /// Tracked step or lifecycle method name; `None` for untracked helpers.
    step: Option<String>,
    depth: usize,
    opened: bool,
}

/// Scan scenario source for steps, lifecycle hooks and produce/consume call sites.
///
/// Recognised shapes:
/// - `#[step]` / `#[test]` marks the next `fn` as a step
/// - `#[before_class]`, `#[after_suite]`, ... mark the next `fn` as a lifecycle method
/// - `#[before_phase(consumer)]` / `#[after_phase(producer, ...)]` scope it to phases
/// - `produce("key")` / `consume("key")` inside a tracked `fn` record a key
///
/// Attributes may share a line with each other and with the `fn` they mark.
/// Only a `fn` outside any open function body starts a new method, so nested
/// helpers keep their calls in the enclosing step. String contents and `//`
/// comments are not scanned for `fn` or calls. Non-literal keys and calls
/// outside tracked functions are skipped.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidAttribute`] for a malformed phase attribute.
pub fn scan(
    source: &str,
    scenario: &str,
    strategy: PositionStrategy,
) -> Result<ScannedScenario, ExtractError> {
    let mut deps = ScenarioDependencies::with_strategy(scenario, strategy);
    let mut lifecycle = Vec::new();
    let mut pending = PendingAttributes::default();
    let mut method: Option<OpenMethod> = None;
    let mut depth = 0usize;
    let mut parens = 0usize;
    let mut in_string = false;

    for (idx, raw) in source.lines().enumerate() {
        let line_no = idx + 1;
        let code = mask_line(raw, &mut in_string);

        let mut start = code.len() - code.trim_start().len();
        while let Some(len) = attribute_len(&code[start..]) {
            if method.is_none() {
                parse_attribute(&code[start + 2..start + len - 1], &mut pending).map_err(
                    |message| ExtractError::InvalidAttribute {
                        scenario: scenario.to_owned(),
                        line: line_no,
                        message,
                    },
                )?;
            }
            start += len;
            start = code.len() - code[start..].trim_start().len();
        }
        let body = &code[start..];
        if body.is_empty() {
            continue;
        }

        if method.is_none()
            && let Some(name) = fn_name(body)
        {
            let attrs = std::mem::take(&mut pending);
            let step = if attrs.is_lifecycle() {
                deps.add_lifecycle_step(name);
                let mut hook = LifecycleMethod::new(format!("{scenario}::{name}"));
                hook.lifecycle = attrs.kinds;
                hook.scope = attrs.scope;
                lifecycle.push(hook);
                Some(name.to_owned())
            } else if attrs.step {
                place_step(&mut deps, name, line_no);
                Some(name.to_owned())
            } else {
                None
            };
            method = Some(OpenMethod {
                step,
                depth,
                opened: false,
            });
        }

        for (kind, key) in call_sites(raw, &code) {
            let Some(step) = method.as_ref().and_then(|m| m.step.as_deref()) else {
                warn!(scenario, line = line_no, key = %key, "call outside a step ignored");
                continue;
            };
            record(&mut deps, step, kind, &key, line_no);
        }

        for c in body.chars() {
            match c {
                '{' => {
                    if let Some(m) = method.as_mut()
                        && depth == m.depth
                    {
                        m.opened = true;
                    }
                    depth += 1;
                }
                '}' => {
                    depth = depth.saturating_sub(1);
                    if method.as_ref().is_some_and(|m| m.opened && depth == m.depth) {
                        method = None;
                    }
                }
                '(' | '[' => parens += 1,
                ')' | ']' => parens = parens.saturating_sub(1),
                // Bodiless declaration such as a trait method.
                ';' if parens == 0
                    && method.as_ref().is_some_and(|m| !m.opened && depth == m.depth) =>
                {
                    method = None;
                }
                _ => {}
            }
        }
    }

    debug!(scenario, steps = deps.len(), "scanned scenario");
    Ok(ScannedScenario {
        dependencies: deps,
        lifecycle,
    })
}

fn place_step(deps: &mut ScenarioDependencies, name: &str, line_no: usize) {
    let next = match deps.strategy() {
        PositionStrategy::SourceLine => line_no as i64,
        PositionStrategy::Synthetic => deps.last_step_position() + 1,
    };
    let step = deps.add_step(name);
    if !step.has_position() {
        step.position = next;
    }
}

fn record(
    deps: &mut ScenarioDependencies,
    step: &str,
    kind: CallKind,
    key: &str,
    line_no: usize,
) {
    match (deps.strategy(), kind) {
        (PositionStrategy::SourceLine, CallKind::Produce) => {
            deps.record_produce_at(step, key, line_no as i64);
        }
        (PositionStrategy::SourceLine, CallKind::Consume) => {
            deps.record_consume_at(step, key, line_no as i64);
        }
        (PositionStrategy::Synthetic, CallKind::Produce) => deps.record_produce(step, key),
        (PositionStrategy::Synthetic, CallKind::Consume) => deps.record_consume(step, key),
    }
}

fn parse_attribute(attr: &str, pending: &mut PendingAttributes) -> Result<(), String> {
    let body = attr.trim_end().trim_end_matches(']');
    let (name, args) = match body.split_once('(') {
        Some((name, rest)) => (name.trim(), Some(rest.trim_end_matches(')'))),
        None => (body.trim(), None),
    };

    if STEP_MARKERS.contains(&name) {
        pending.step = true;
    } else if let Some(kind) = LifecycleKind::from_attribute(name) {
        pending.kinds.push(kind);
    } else if name == "before_phase" || name == "after_phase" {
        if pending.scope.is_some() {
            return Err(format!("second phase scope '{name}' on one method"));
        }
        let phases = parse_phases(args.unwrap_or_default())?;
        pending.scope = Some(if name == "before_phase" {
            PhaseScope::before(phases)
        } else {
            PhaseScope::after(phases)
        });
    }
    Ok(())
}

fn parse_phases(args: &str) -> Result<Vec<Phase>, String> {
    args.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

/// Name of the function declared on this line, if any.
fn fn_name(line: &str) -> Option<&str> {
    let mut search = line;
    loop {
        let at = search.find("fn ")?;
        if at == 0 || !is_ident_char(search[..at].chars().next_back()?) {
            let rest = search[at + 3..].trim_start();
            let end = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
            return (end > 0).then(|| &rest[..end]);
        }
        search = &search[at + 3..];
    }
}

/// Literal-keyed `produce("..")` / `consume("..")` calls on one line, in order.
///
/// `code` is the line as returned by [`mask_line`]; matches that fall inside a
/// string or comment there are dropped.
fn call_sites(line: &str, code: &str) -> Vec<(CallKind, String)> {
    let mut found = Vec::new();
    for (kind, needle) in [(CallKind::Produce, "produce("), (CallKind::Consume, "consume(")] {
        let mut offset = 0;
        while let Some(at) = line[offset..].find(needle) {
            let start = offset + at;
            offset = start + needle.len();
            let bounded = line[..start]
                .chars()
                .next_back()
                .is_none_or(|c| !is_ident_char(c));
            let in_code = code.get(start..).is_some_and(|c| c.starts_with(needle));
            if !bounded || !in_code {
                continue;
            }
            if let Some(key) = string_literal(&line[offset..]) {
                found.push((start, kind, key));
            }
        }
    }
    found.sort_by_key(|(start, _, _)| *start);
    found.into_iter().map(|(_, kind, key)| (kind, key)).collect()
}

/// Copy of `line` with string contents, char literals and `//` comments
/// blanked to spaces. Byte offsets match `line`. `in_string` carries an open
/// string literal across lines.
fn mask_line(line: &str, in_string: &mut bool) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if *in_string {
            match c {
                '\\' => {
                    blank(&mut out, c);
                    if let Some((_, escaped)) = chars.next() {
                        blank(&mut out, escaped);
                    }
                }
                '"' => {
                    *in_string = false;
                    out.push('"');
                }
                _ => blank(&mut out, c),
            }
            continue;
        }
        match c {
            '"' => {
                *in_string = true;
                out.push('"');
            }
            '/' if line[i..].starts_with("//") => {
                out.extend(std::iter::repeat_n(' ', line.len() - i));
                break;
            }
            '\'' => match char_literal_len(&line[i..]) {
                Some(len) => {
                    out.extend(std::iter::repeat_n(' ', len));
                    while chars.next_if(|&(j, _)| j < i + len).is_some() {}
                }
                None => out.push(c),
            },
            _ => out.push(c),
        }
    }
    out
}

fn blank(out: &mut String, c: char) {
    out.extend(std::iter::repeat_n(' ', c.len_utf8()));
}

/// Byte length of a char literal at the start of `s`, or `None` for a lifetime.
fn char_literal_len(s: &str) -> Option<usize> {
    let rest = s.strip_prefix('\'')?;
    if rest.starts_with('\\') {
        return rest.get(2..)?.find('\'').map(|p| p + 4);
    }
    let c = rest.chars().next()?;
    rest[c.len_utf8()..]
        .starts_with('\'')
        .then(|| c.len_utf8() + 2)
}

/// Byte length of a `#[...]` attribute at the start of `code`, brackets included.
fn attribute_len(code: &str) -> Option<usize> {
    if !code.starts_with("#[") {
        return None;
    }
    let mut depth = 0usize;
    for (i, c) in code.char_indices().skip(1) {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn string_literal(input: &str) -> Option<String> {
    let mut chars = input.trim_start().chars();
    if chars.next()? != '"' {
        return None;
    }
    let mut s = String::new();
    loop {
        match chars.next()? {
            '\\' => s.push(chars.next()?),
            '"' => return Some(s),
            c => s.push(c),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
