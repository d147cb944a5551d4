//! Terminal output for search results

use crate::automaton::Occurrence;
use crate::server::RemoteOccurrence;
use std::io;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Stdout with color when asked for and supported
pub fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Byte offset of every character boundary in `text`, end included
fn char_boundaries(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect()
}

fn write_payload<W: WriteColor>(out: &mut W, data: &[u8]) -> io::Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    write!(out, "\t")?;
    out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
    write!(out, "{}", String::from_utf8_lossy(data))?;
    out.reset()
}

/// One line per occurrence: `[label:]start-end:needle[\tpayload]`
///
/// The needle is cut from `text` when it was not reconstructed by the search.
pub fn print_occurrences<W: WriteColor>(
    out: &mut W,
    label: Option<&str>,
    text: &str,
    occurrences: &[Occurrence<'_>],
) -> io::Result<()> {
    let bounds = char_boundaries(text);

    for o in occurrences {
        if let Some(label) = label {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
            write!(out, "{}", label)?;
            out.reset()?;
            write!(out, ":")?;
        }

        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{}-{}", o.start, o.end)?;
        out.reset()?;
        write!(out, ":")?;

        let needle = match &o.needle {
            Some(needle) => needle.as_str(),
            None => match (bounds.get(o.start), bounds.get(o.end)) {
                (Some(&from), Some(&to)) => &text[from..to],
                _ => "",
            },
        };
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(out, "{}", needle)?;
        out.reset()?;

        write_payload(out, o.user_data.unwrap_or_default())?;
        writeln!(out)?;
    }

    Ok(())
}

/// Print `text` with occurrences highlighted; overlapping matches merge
pub fn print_highlighted<W: WriteColor>(
    out: &mut W,
    text: &str,
    occurrences: &[Occurrence<'_>],
) -> io::Result<()> {
    let bounds = char_boundaries(text);
    let chars = bounds.len() - 1;

    let mut spans: Vec<(usize, usize)> = occurrences
        .iter()
        .map(|o| (o.start.min(chars), o.end.min(chars)))
        .filter(|(start, end)| start < end)
        .collect();
    spans.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    let mut pos = 0;
    for (start, end) in merged {
        write!(out, "{}", &text[bounds[pos]..bounds[start]])?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(out, "{}", &text[bounds[start]..bounds[end]])?;
        out.reset()?;
        pos = end;
    }
    writeln!(out, "{}", &text[bounds[pos]..])?;

    Ok(())
}

/// Print occurrences returned by a server
pub fn print_remote<W: WriteColor>(out: &mut W, occurrences: &[RemoteOccurrence]) -> io::Result<()> {
    for o in occurrences {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(out, "{}", o.needle.as_deref().unwrap_or("<match>"))?;
        out.reset()?;
        write_payload(out, &o.user_data)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Print the occurrence count (for -c flag)
pub fn print_count<W: WriteColor>(out: &mut W, label: Option<&str>, count: usize) -> io::Result<()> {
    if let Some(label) = label {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(out, "{}", label)?;
        out.reset()?;
        write!(out, ":")?;
    }
    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    writeln!(out, "{}", count)?;
    out.reset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use termcolor::NoColor;

    fn occurrence(start: usize, end: usize, data: Option<&[u8]>) -> Occurrence<'_> {
        Occurrence {
            start,
            end,
            state: 1,
            user_data: data,
            needle: None,
        }
    }

    fn render(f: impl FnOnce(&mut NoColor<Vec<u8>>) -> io::Result<()>) -> String {
        let mut out = NoColor::new(Vec::new());
        f(&mut out).unwrap();
        String::from_utf8(out.into_inner()).unwrap()
    }

    #[test]
    fn test_occurrence_lines() {
        let found = [occurrence(1, 4, None), occurrence(4, 8, Some(&b"x"[..]))];
        let text = render(|out| print_occurrences(out, Some("2"), "ahishers", &found));
        assert_eq!(text, "2:1-4:his\n2:4-8:hers\tx\n");
    }

    #[test]
    fn test_needle_cut_on_char_boundaries() {
        let found = [occurrence(1, 3, None)];
        let text = render(|out| print_occurrences(out, None, "añbé", &found));
        assert_eq!(text, "1-3:ñb\n");
    }

    #[test]
    fn test_highlight_merges_overlaps() {
        let found = [occurrence(1, 4, None), occurrence(3, 6, None), occurrence(7, 8, None)];
        let text = render(|out| print_highlighted(out, "ahishers", &found));
        assert_eq!(text, "ahishers\n");
    }

    #[test]
    fn test_remote_and_count() {
        let remote = [RemoteOccurrence {
            user_data: b"data".to_vec(),
            needle: Some("she".to_string()),
        }];
        assert_eq!(render(|out| print_remote(out, &remote)), "she\tdata\n");
        assert_eq!(render(|out| print_count(out, Some("a"), 3)), "a:3\n");
    }
}
