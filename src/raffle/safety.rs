//! Placeholder scanning and safe substitution for raffle messages.
//!
//! Templates use `{field}` placeholders with `{{`/`}}` as literal braces.
//! Only the acting member, the raffle name and (for join messages) the entry
//! count can be substituted, and members only expose a fixed attribute set.
//! Everything else is rejected when the definition is validated, so
//! rendering never has to fail.

use super::UserId;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref TOKEN: Regex =
        Regex::new(r"\{\{|\}\}|\{([^{}]*)\}|[{}]").expect("placeholder token regex is valid");
}

/// Member attributes a template may reference.
pub const SAFE_ATTRIBUTES: [&str; 4] = ["id", "name", "display_name", "mention"];

/// Which message a template belongs to; decides the member root name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Join,
    End,
}

impl TemplateKind {
    pub fn member_root(&self) -> &'static str {
        match self {
            Self::Join => "user",
            Self::End => "winner",
        }
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Join => "join_message",
            Self::End => "end_message",
        }
    }

    fn allows_entry_count(&self) -> bool {
        matches!(self, Self::Join)
    }
}

/// A rejected placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsafePlaceholder {
    pub token: String,
    pub reason: &'static str,
}

impl fmt::Display for UnsafePlaceholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" {}", self.token, self.reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberAttr {
    Id,
    Name,
    DisplayName,
    Mention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Member(Option<MemberAttr>),
    Raffle,
    EntryCount,
}

enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Field(&'a str),
    Stray(&'a str),
}

fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut last = 0;
    for caps in TOKEN.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            out.push(Segment::Literal(&template[last..whole.start()]));
        }
        out.push(match (whole.as_str(), caps.get(1)) {
            (_, Some(field)) => Segment::Field(field.as_str()),
            ("{{", None) => Segment::Brace('{'),
            ("}}", None) => Segment::Brace('}'),
            (other, None) => Segment::Stray(other),
        });
        last = whole.end();
    }
    if last < template.len() {
        out.push(Segment::Literal(&template[last..]));
    }
    out
}

fn classify(field: &str, kind: TemplateKind) -> Result<Placeholder, &'static str> {
    if field.contains(['!', ':', '[', ']']) {
        return Err("uses an unsupported conversion, format spec or index");
    }
    let (root, attr) = match field.split_once('.') {
        Some((root, attr)) => (root, Some(attr)),
        None => (field, None),
    };
    if root == kind.member_root() {
        let attr = match attr {
            None => None,
            Some("id") => Some(MemberAttr::Id),
            Some("name") => Some(MemberAttr::Name),
            Some("display_name") => Some(MemberAttr::DisplayName),
            Some("mention") => Some(MemberAttr::Mention),
            Some(_) => return Err("is not an available attribute"),
        };
        return Ok(Placeholder::Member(attr));
    }
    match (root, attr) {
        ("raffle", None) => Ok(Placeholder::Raffle),
        ("entry_count", None) if kind.allows_entry_count() => Ok(Placeholder::EntryCount),
        _ => Err("is not a recognized placeholder"),
    }
}

/// Check every placeholder in `template`; report the first unsafe one.
pub fn scan(template: &str, kind: TemplateKind) -> Result<(), UnsafePlaceholder> {
    for segment in segments(template) {
        match segment {
            Segment::Field(field) => {
                classify(field, kind).map_err(|reason| UnsafePlaceholder {
                    token: format!("{{{}}}", field),
                    reason,
                })?;
            }
            Segment::Stray(brace) => {
                return Err(UnsafePlaceholder {
                    token: brace.to_string(),
                    reason: "is an unmatched brace (use {{ or }} for a literal brace)",
                });
            }
            Segment::Literal(_) | Segment::Brace(_) => {}
        }
    }
    Ok(())
}

/// The only view of a member a template can see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeMember {
    pub id: UserId,
    pub name: String,
    pub display_name: String,
    pub mention: String,
}

impl SafeMember {
    /// Placeholder member for ids the directory no longer knows.
    pub fn unknown(id: UserId, mention: String) -> Self {
        Self {
            id,
            name: id.to_string(),
            display_name: id.to_string(),
            mention,
        }
    }

    fn attr(&self, attr: Option<MemberAttr>) -> String {
        match attr {
            None | Some(MemberAttr::Name) => self.name.clone(),
            Some(MemberAttr::Id) => self.id.to_string(),
            Some(MemberAttr::DisplayName) => self.display_name.clone(),
            Some(MemberAttr::Mention) => self.mention.clone(),
        }
    }
}

/// Values substituted into a template.
pub struct Substitutions<'a> {
    pub member: &'a SafeMember,
    pub raffle: &'a str,
    pub entry_count: Option<usize>,
}

/// Render a template previously accepted by [`scan`].
pub fn render(template: &str, kind: TemplateKind, subs: &Substitutions<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    for segment in segments(template) {
        match segment {
            Segment::Literal(text) | Segment::Stray(text) => out.push_str(text),
            Segment::Brace(c) => out.push(c),
            Segment::Field(field) => match classify(field, kind) {
                Ok(Placeholder::Member(attr)) => out.push_str(&subs.member.attr(attr)),
                Ok(Placeholder::Raffle) => out.push_str(subs.raffle),
                Ok(Placeholder::EntryCount) => match subs.entry_count {
                    Some(n) => out.push_str(&n.to_string()),
                    None => out.push_str("{entry_count}"),
                },
                Err(_) => {
                    out.push('{');
                    out.push_str(field);
                    out.push('}');
                }
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> SafeMember {
        SafeMember {
            id: 42,
            name: "alice".into(),
            display_name: "Alice A.".into(),
            mention: "<@42>".into(),
        }
    }

    #[test]
    fn test_scan_accepts_safe_placeholders() {
        assert!(scan("Congrats {winner.mention}, you won {raffle}!", TemplateKind::End).is_ok());
        assert!(scan("{winner} {winner.id} {winner.display_name}", TemplateKind::End).is_ok());
        assert!(scan("{user.name} is entrant #{entry_count}", TemplateKind::Join).is_ok());
        assert!(scan("no placeholders at all", TemplateKind::Join).is_ok());
        assert!(scan("literal {{braces}}", TemplateKind::Join).is_ok());
    }

    #[test]
    fn test_scan_rejects_foreign_attributes() {
        let err = scan("{winner.guild.owner}", TemplateKind::End).unwrap_err();
        assert_eq!(err.token, "{winner.guild.owner}");

        let err = scan("{user.roles}", TemplateKind::Join).unwrap_err();
        assert_eq!(err.reason, "is not an available attribute");
    }

    #[test]
    fn test_scan_rejects_wrong_root_for_kind() {
        assert!(scan("{user.mention}", TemplateKind::End).is_err());
        assert!(scan("{winner.mention}", TemplateKind::Join).is_err());
        assert!(scan("{entry_count}", TemplateKind::End).is_err());
    }

    #[test]
    fn test_scan_rejects_conversions_and_strays() {
        assert!(scan("{user!r}", TemplateKind::Join).is_err());
        assert!(scan("{user:>10}", TemplateKind::Join).is_err());
        assert!(scan("{}", TemplateKind::Join).is_err());
        let err = scan("oops { here", TemplateKind::Join).unwrap_err();
        assert_eq!(err.token, "{");
        assert!(scan("closing } only", TemplateKind::Join).is_err());
    }

    #[test]
    fn test_render_substitutes_member_and_raffle() {
        let member = alice();
        let subs = Substitutions {
            member: &member,
            raffle: "spring",
            entry_count: None,
        };
        assert_eq!(
            render(
                "Congratulations {winner.mention}, you have won the {raffle} raffle!",
                TemplateKind::End,
                &subs
            ),
            "Congratulations <@42>, you have won the spring raffle!"
        );
        assert_eq!(render("{winner}/{winner.id}", TemplateKind::End, &subs), "alice/42");
    }

    #[test]
    fn test_render_entry_count_and_escapes() {
        let member = alice();
        let subs = Substitutions {
            member: &member,
            raffle: "r",
            entry_count: Some(3),
        };
        assert_eq!(
            render("{{{user.display_name}}} is #{entry_count}", TemplateKind::Join, &subs),
            "{Alice A.} is #3"
        );
    }
}
