//! Offline query engine.
//!
//! Operates on the in-memory [`Notebook`] loaded from the local store, which
//! stays constant after load. All matching is case-insensitive substring
//! matching over Unicode-lowercased text. Operations receive the parsed CLI
//! options as a plain value and write to a caller-supplied writer, so tests
//! capture output in a buffer and nothing reads global state.

use std::io::Write;

use crate::error::{Error, Result};
use crate::html::html_to_text;
use crate::store::Notebook;

/// Parsed offline-mode options, passed explicitly into [`run`].
#[derive(Debug, Clone, Default)]
pub struct QueryOpts {
    pub title: Option<String>,
    pub section: Option<String>,
    pub find: Option<String>,
    pub all_titles: bool,
    pub all_sections: bool,
}

/// Dispatch one offline run.
///
/// First chain picks at most one listing behavior: find-in-content, else
/// list-all-sections, else list-titles-in-section. Independently, a section
/// keyword plus a title keyword runs the specific-note printer; a title
/// keyword alone runs find-in-titles.
pub fn run(out: &mut impl Write, notebook: &Notebook, opts: &QueryOpts) -> Result<()> {
    if let Some(keyword) = &opts.find {
        find_in_content(out, notebook, keyword)?;
    } else if opts.all_sections {
        print_all_sections(out, notebook)?;
    } else if let (Some(section), true) = (&opts.section, opts.all_titles) {
        print_all_titles_in_section(out, notebook, section)?;
    }

    match (&opts.section, &opts.title) {
        (Some(section), Some(title)) => print_note(out, notebook, section, title)?,
        (None, Some(title)) => find_in_titles(out, notebook, title)?,
        _ => {}
    }

    Ok(())
}

/// Every section name, in stored insertion order.
pub fn print_all_sections(out: &mut impl Write, notebook: &Notebook) -> Result<()> {
    for section in notebook.keys() {
        writeln!(out, "{}", section)?;
    }
    Ok(())
}

/// Every title under one exactly-named section, in stored order. An unknown
/// section is an explicit error rather than a panic.
pub fn print_all_titles_in_section(
    out: &mut impl Write,
    notebook: &Notebook,
    section: &str,
) -> Result<()> {
    let titles = notebook
        .get(section)
        .ok_or_else(|| Error::SectionNotFound(section.to_string()))?;
    for title in titles.keys() {
        writeln!(out, "{}", title)?;
    }
    Ok(())
}

/// For every section, print the titles whose page content contains the
/// keyword. Sections without a match produce no output at all.
pub fn find_in_content(out: &mut impl Write, notebook: &Notebook, keyword: &str) -> Result<()> {
    writeln!(out, "Following titles have been found:")?;
    let needle = keyword.to_lowercase();
    for (section, pages) in notebook {
        let matching: Vec<&String> = pages
            .iter()
            .filter(|(_, html)| html.to_lowercase().contains(&needle))
            .map(|(title, _)| title)
            .collect();
        if matching.is_empty() {
            continue;
        }
        writeln!(out, "##### SECTION: {} #####", section)?;
        for title in matching {
            writeln!(out, "          TITLE: {}", title)?;
        }
    }
    Ok(())
}

/// Find titles matching the keyword across all sections. When exactly one
/// title matches, its HTML-stripped text is printed as well — with a single
/// hit the operator clearly wanted that page.
pub fn find_in_titles(out: &mut impl Write, notebook: &Notebook, keyword: &str) -> Result<()> {
    writeln!(out, "Following titles have been found in all sections:")?;
    let needle = keyword.to_lowercase();

    let mut found: Vec<(&String, &String)> = Vec::new();
    for (section, pages) in notebook {
        let matching: Vec<&String> = pages
            .keys()
            .filter(|title| title.to_lowercase().contains(&needle))
            .collect();
        if matching.is_empty() {
            continue;
        }
        writeln!(out, "##### SECTION: {} #####", section)?;
        for title in matching {
            found.push((section, title));
            writeln!(out, "          TITLE: {}", title)?;
        }
    }

    if let [(section, title)] = found.as_slice() {
        let html = &notebook[*section][*title];
        writeln!(out, "{}", html_to_text(html))?;
    }
    Ok(())
}

/// Print a specific note from a partial section keyword and a partial title
/// keyword. More than one candidate section is ambiguous: the candidates are
/// listed and nothing is printed, so the operator can re-run with a more
/// specific keyword.
pub fn print_note(
    out: &mut impl Write,
    notebook: &Notebook,
    section_keyword: &str,
    title_keyword: &str,
) -> Result<()> {
    let needle = section_keyword.to_lowercase();
    let candidates: Vec<&String> = notebook
        .keys()
        .filter(|name| name.to_lowercase().contains(&needle))
        .collect();

    match candidates.as_slice() {
        [] => {
            writeln!(out, "Provided section name not found.")?;
        }
        [section] => {
            let pages = &notebook[*section];
            let title_needle = title_keyword.to_lowercase();
            writeln!(out, "##### SECTION: {} #####", section)?;
            for (title, html) in pages {
                if !title.to_lowercase().contains(&title_needle) {
                    continue;
                }
                writeln!(out, "##### TITLE: {}", title)?;
                writeln!(out, "{}", html_to_text(html))?;
            }
        }
        many => {
            let names: Vec<&str> = many.iter().map(|s| s.as_str()).collect();
            writeln!(
                out,
                "Section name: {}, matches more than one section: {:?}.",
                section_keyword, names
            )?;
        }
    }
    Ok(())
}
