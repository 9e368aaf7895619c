// ebuild: a build orchestrator for C and C++ projects.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Parsers for the header-dependency side channel each compiler family
//! writes alongside an object file: a GCC-style Makefile fragment
//! (`-MMD -MF`), or an MSVC-style JSON document (`/sourceDependencies`).

use std::path::{Path, PathBuf};

/// `<output>.<ext>`, appended to the full file name rather than replacing
/// the object file's own extension, so `foo.o` and `foo.obj` get `foo.o.d`
/// and `foo.obj.json` instead of clobbering each other.
pub(crate) fn sibling_path(output_object: &Path, ext: &str) -> PathBuf {
    let mut name = output_object.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Parses a GCC/Clang `-MMD`-style Makefile fragment: `target: dep dep \`
/// continuations, backslash-escaped spaces, possibly several rules back to
/// back. Returns every dependency path across every rule, in file order.
pub(crate) fn parse_make_rule(contents: &str) -> Vec<PathBuf> {
    let joined = contents.replace("\\\r\n", " ").replace("\\\n", " ");
    let mut paths = Vec::new();
    for line in joined.lines() {
        let Some((_target, deps)) = line.split_once(':') else {
            continue;
        };
        let mut token = String::new();
        let mut chars = deps.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' if chars.peek() == Some(&' ') => {
                    token.push(' ');
                    chars.next();
                }
                c if c.is_whitespace() => {
                    if !token.is_empty() {
                        paths.push(PathBuf::from(std::mem::take(&mut token)));
                    }
                }
                c => token.push(c),
            }
        }
        if !token.is_empty() {
            paths.push(PathBuf::from(token));
        }
    }
    paths
}

/// Parses an MSVC `/sourceDependencies` JSON document down to the flat
/// `Includes` list `cl.exe` reports (the source file itself is not
/// listed there, so the caller prepends it).
pub(crate) fn parse_source_dependencies_json(contents: &str) -> Result<Vec<PathBuf>, serde_json::Error> {
    #[derive(serde::Deserialize)]
    struct Document {
        #[serde(rename = "Data")]
        data: Data,
    }
    #[derive(serde::Deserialize)]
    struct Data {
        #[serde(rename = "Includes", default)]
        includes: Vec<String>,
    }
    let doc: Document = serde_json::from_str(contents)?;
    Ok(doc.data.includes.into_iter().map(PathBuf::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_path_appends_rather_than_replaces_extension() {
        assert_eq!(sibling_path(Path::new("obj/foo.o"), "d"), PathBuf::from("obj/foo.o.d"));
        assert_eq!(
            sibling_path(Path::new("obj/foo.obj"), "json"),
            PathBuf::from("obj/foo.obj.json")
        );
    }

    #[test]
    fn parses_a_single_line_make_rule() {
        let paths = parse_make_rule("foo.o: foo.c header.h\n");
        assert_eq!(paths, vec![PathBuf::from("foo.c"), PathBuf::from("header.h")]);
    }

    #[test]
    fn parses_a_continued_make_rule_with_escaped_spaces() {
        let contents = "foo.o: foo.c \\\n  include/a\\ b.h \\\n  include/c.h\n";
        let paths = parse_make_rule(contents);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("foo.c"),
                PathBuf::from("include/a b.h"),
                PathBuf::from("include/c.h"),
            ]
        );
    }

    #[test]
    fn parses_source_dependencies_includes_list() {
        let json = r#"{"Version":"1.2","Data":{"Source":"foo.c","Includes":["a.h","b.h"]}}"#;
        let includes = parse_source_dependencies_json(json).unwrap();
        assert_eq!(includes, vec![PathBuf::from("a.h"), PathBuf::from("b.h")]);
    }
}
