// src/repository/index.rs

//! Package index model and `index.xml` parser
//!
//! The index is a flat list of packages, each with one download URL per
//! architecture family:
//!
//! ```xml
//! <packages>
//!   <package name="foo">
//!     <amd><url>http://example.com/foo-amd.tar.gz</url></amd>
//!     <arm><url>http://example.com/foo-arm.tar.gz</url></arm>
//!   </package>
//! </packages>
//! ```

use crate::arch::ArchFamily;
use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// One installable package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageEntry {
    /// Package name, also the name of its store directory
    pub name: String,

    /// Archive URL for x86/x86_64 hosts (empty if not provided)
    pub amd_url: String,

    /// Archive URL for arm/aarch64 hosts (empty if not provided)
    pub arm_url: String,
}

impl PackageEntry {
    /// Create a package entry
    pub fn new(name: impl Into<String>, amd_url: impl Into<String>, arm_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amd_url: amd_url.into(),
            arm_url: arm_url.into(),
        }
    }

    /// Download URL for a family, `None` when the slot is empty
    pub fn url_for(&self, family: ArchFamily) -> Option<&str> {
        let url = match family {
            ArchFamily::Amd => &self.amd_url,
            ArchFamily::Arm => &self.arm_url,
        };

        if url.is_empty() { None } else { Some(url.as_str()) }
    }

    fn url_slot_mut(&mut self, family: ArchFamily) -> &mut String {
        match family {
            ArchFamily::Amd => &mut self.amd_url,
            ArchFamily::Arm => &mut self.arm_url,
        }
    }
}

/// Parsed package index, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    pub packages: Vec<PackageEntry>,
}

impl Index {
    /// Parse an index document held in memory
    pub fn parse(xml: &str) -> Result<Self> {
        Self::from_reader(xml.as_bytes())
    }

    /// Parse an index file from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::IoError(format!("Failed to open index {}: {}", path.display(), e))
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse an index document from any buffered reader
    pub fn from_reader<R: BufRead>(source: R) -> Result<Self> {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut packages = Vec::new();

        // Names of the currently open elements, outermost first
        let mut open: Vec<String> = Vec::new();
        let mut current: Option<PackageEntry> = None;
        let mut seen_root = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let tag = tag_name(&e);
                    Self::check_root(&open, &tag, &mut seen_root)?;

                    if open.len() == 1 && tag == "package" {
                        current = Some(PackageEntry {
                            name: package_name(&e)?,
                            ..PackageEntry::default()
                        });
                    }
                    open.push(tag);

                    // A repeated <url> replaces the earlier value
                    if let (Some(pkg), Some(family)) = (current.as_mut(), url_family(&open)) {
                        pkg.url_slot_mut(family).clear();
                    }
                }
                Ok(Event::Empty(e)) => {
                    let tag = tag_name(&e);
                    Self::check_root(&open, &tag, &mut seen_root)?;

                    open.push(tag);
                    if let (Some(pkg), Some(family)) = (current.as_mut(), url_family(&open)) {
                        pkg.url_slot_mut(family).clear();
                    }
                    let tag = open.pop().unwrap_or_default();

                    // <package name="x"/> lists a package with no URLs
                    if open.len() == 1 && tag == "package" {
                        packages.push(PackageEntry {
                            name: package_name(&e)?,
                            ..PackageEntry::default()
                        });
                    }
                }
                Ok(Event::End(_)) => {
                    let tag = open.pop().unwrap_or_default();
                    if open.len() == 1 && tag == "package" {
                        if let Some(mut pkg) = current.take() {
                            pkg.amd_url = pkg.amd_url.trim().to_string();
                            pkg.arm_url = pkg.arm_url.trim().to_string();
                            packages.push(pkg);
                        }
                    }
                }
                Ok(Event::Text(e)) => {
                    if let (Some(pkg), Some(family)) = (current.as_mut(), url_family(&open)) {
                        let text = e.unescape().map_err(|e| {
                            Error::ParseError(format!("Invalid text in index: {}", e))
                        })?;
                        pkg.url_slot_mut(family).push_str(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let (Some(pkg), Some(family)) = (current.as_mut(), url_family(&open)) {
                        pkg.url_slot_mut(family)
                            .push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::ParseError(format!(
                        "Failed to parse index at position {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        if !seen_root {
            return Err(Error::ParseError(
                "Index document has no <packages> element".to_string(),
            ));
        }
        if !open.is_empty() {
            return Err(Error::ParseError(format!(
                "Unexpected end of index inside <{}>",
                open.join("><")
            )));
        }

        debug!("Parsed index with {} packages", packages.len());
        Ok(Self { packages })
    }

    /// First package with the given name
    pub fn find(&self, name: &str) -> Option<&PackageEntry> {
        self.packages.iter().find(|pkg| pkg.name == name)
    }

    /// Number of packages in the index
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the index lists no packages
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    fn check_root(open: &[String], tag: &str, seen_root: &mut bool) -> Result<()> {
        if !open.is_empty() {
            return Ok(());
        }
        if *seen_root {
            return Err(Error::ParseError(format!(
                "Unexpected element <{}> after root element",
                tag
            )));
        }
        if tag != "packages" {
            return Err(Error::ParseError(format!(
                "Expected root element <packages>, found <{}>",
                tag
            )));
        }
        *seen_root = true;
        Ok(())
    }
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn package_name(e: &BytesStart<'_>) -> Result<String> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::ParseError(format!("Invalid attribute: {}", e)))?;
        if attr.key.as_ref() == b"name" {
            let value = attr
                .unescape_value()
                .map_err(|e| Error::ParseError(format!("Invalid package name: {}", e)))?;
            return Ok(value.into_owned());
        }
    }

    Err(Error::ParseError(
        "Package element is missing its name attribute".to_string(),
    ))
}

/// Family whose URL is being read, if the cursor is at
/// `packages/package/{amd,arm}/url`
fn url_family(open: &[String]) -> Option<ArchFamily> {
    match open {
        [_, pkg, family, url] if pkg == "package" && url == "url" => match family.as_str() {
            "amd" => Some(ArchFamily::Amd),
            "arm" => Some(ArchFamily::Arm),
            _ => None,
        },
        _ => None,
    }
}
