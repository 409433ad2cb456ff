//! Line-based terminal prompts for collision and tag review.
//!
//! Generic over the reader and writer so the dialogues can be driven from
//! tests with in-memory buffers.

use std::io::{self, BufRead, Write};

use brandfolio_core::Store;
use brandfolio_import::{Collision, ResolutionAction, TagMergeGroup};

/// Answer to a collision prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CollisionAnswer {
    Resolve(ResolutionAction),
    /// Apply the action to this and every remaining collision.
    ResolveRest(ResolutionAction),
    Abort,
}

/// Answer to a tag-group prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TagAnswer {
    Use(String),
    SkipAll,
    Abort,
}

pub(crate) struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    pub(crate) fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub(crate) fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Reads one trimmed line. End of input reads as `None`.
    fn read_answer(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub(crate) fn ask_collision(
        &mut self,
        collision: &Collision,
        remaining: usize,
    ) -> io::Result<CollisionAnswer> {
        writeln!(
            self.output,
            "\nDuplicate store ({remaining} left): \"{}\"",
            collision.incoming.store_name
        )?;
        write_store(&mut self.output, "existing", &collision.existing)?;
        write_store(&mut self.output, "incoming", &collision.incoming)?;

        loop {
            write!(
                self.output,
                "[m]erge, [o]verwrite, [s]kip, uppercase for all remaining, [a]bort: "
            )?;
            self.output.flush()?;

            let Some(answer) = self.read_answer()? else {
                return Ok(CollisionAnswer::Abort);
            };
            let parsed = match answer.as_str() {
                "m" | "merge" => Some(CollisionAnswer::Resolve(ResolutionAction::Merge)),
                "o" | "overwrite" => Some(CollisionAnswer::Resolve(ResolutionAction::Overwrite)),
                "s" | "skip" => Some(CollisionAnswer::Resolve(ResolutionAction::Skip)),
                "M" => Some(CollisionAnswer::ResolveRest(ResolutionAction::Merge)),
                "O" => Some(CollisionAnswer::ResolveRest(ResolutionAction::Overwrite)),
                "S" => Some(CollisionAnswer::ResolveRest(ResolutionAction::Skip)),
                "a" | "A" | "abort" => Some(CollisionAnswer::Abort),
                _ => None,
            };
            match parsed {
                Some(answer) => return Ok(answer),
                None => writeln!(self.output, "unrecognised answer '{answer}'")?,
            }
        }
    }

    /// Asks which member of `group` to keep. An empty answer keeps the
    /// primary; a number picks that member.
    pub(crate) fn ask_tag_group(
        &mut self,
        group: &TagMergeGroup,
        position: usize,
        total: usize,
    ) -> io::Result<TagAnswer> {
        let members: Vec<&str> = group.members().collect();
        writeln!(self.output, "\nSimilar tags ({position}/{total}):")?;
        for (idx, member) in members.iter().enumerate() {
            writeln!(self.output, "  {}) {member}", idx + 1)?;
        }

        loop {
            write!(
                self.output,
                "keep which? [1-{}, enter = 1, s = skip tag cleanup, a = abort]: ",
                members.len()
            )?;
            self.output.flush()?;

            let Some(answer) = self.read_answer()? else {
                return Ok(TagAnswer::Abort);
            };
            match answer.as_str() {
                "" => return Ok(TagAnswer::Use(group.primary.clone())),
                "s" | "skip" => return Ok(TagAnswer::SkipAll),
                "a" | "abort" => return Ok(TagAnswer::Abort),
                other => {
                    if let Some(member) = other
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .and_then(|idx| members.get(idx))
                    {
                        return Ok(TagAnswer::Use((*member).to_string()));
                    }
                    writeln!(self.output, "unrecognised answer '{other}'")?;
                }
            }
        }
    }
}

fn write_store(out: &mut impl Write, label: &str, store: &Store) -> io::Result<()> {
    let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
    writeln!(
        out,
        "  {label:<8} name: {}  website: {}  instagram: {}  tags: [{}]  price: {}",
        store.store_name,
        or_dash(&store.website),
        or_dash(&store.instagram_name),
        store.tags.join(", "),
        store
            .price_range
            .map_or_else(|| "-".to_string(), |p| p.to_string())
    )
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn collision() -> Collision {
        Collision {
            incoming: Store::new("GANNI"),
            existing: Store::new("Ganni"),
        }
    }

    #[test]
    fn collision_answers() {
        let mut p = prompter("x\nm\n");
        assert_eq!(
            p.ask_collision(&collision(), 1).unwrap(),
            CollisionAnswer::Resolve(ResolutionAction::Merge)
        );
        let shown = String::from_utf8(p.output).unwrap();
        assert!(shown.contains("unrecognised answer 'x'"));
        assert!(shown.contains("existing"));
    }

    #[test]
    fn uppercase_applies_to_rest() {
        let mut p = prompter("S\n");
        assert_eq!(
            p.ask_collision(&collision(), 3).unwrap(),
            CollisionAnswer::ResolveRest(ResolutionAction::Skip)
        );
    }

    #[test]
    fn end_of_input_aborts() {
        let mut p = prompter("");
        assert_eq!(p.ask_collision(&collision(), 1).unwrap(), CollisionAnswer::Abort);
    }

    #[test]
    fn tag_group_answers() {
        let group = TagMergeGroup {
            primary: "Minimalist".to_string(),
            variants: vec!["minimalist".to_string(), "Minimalizt".to_string()],
        };
        assert_eq!(
            prompter("\n").ask_tag_group(&group, 1, 1).unwrap(),
            TagAnswer::Use("Minimalist".to_string())
        );
        assert_eq!(
            prompter("9\n2\n").ask_tag_group(&group, 1, 1).unwrap(),
            TagAnswer::Use("minimalist".to_string())
        );
        assert_eq!(prompter("s\n").ask_tag_group(&group, 1, 1).unwrap(), TagAnswer::SkipAll);
        assert_eq!(prompter("0\na\n").ask_tag_group(&group, 1, 1).unwrap(), TagAnswer::Abort);
    }
}
