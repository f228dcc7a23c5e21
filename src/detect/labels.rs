use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Static label-id to class-name table.
///
/// Loaded once at startup from a text file with one `id<whitespace>name`
/// entry per line (the format shipped alongside COCO detection models).
#[derive(Clone, Debug, Default)]
pub struct LabelTable {
    names: HashMap<u32, String>,
}

impl LabelTable {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read label file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid label file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let mut names = HashMap::new();
        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (id, name) = line
                .split_once(char::is_whitespace)
                .ok_or_else(|| anyhow!("line {}: expected '<id> <name>'", idx + 1))?;
            let id: u32 = id
                .parse()
                .map_err(|_| anyhow!("line {}: label id '{}' is not an integer", idx + 1, id))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(anyhow!("line {}: empty label name", idx + 1));
            }
            names.insert(id, name.to_string());
        }
        Ok(Self { names })
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Resolve a class name to its id. When a name appears more than once the
    /// lowest id wins so the lookup is stable.
    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.names
            .iter()
            .filter(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
            .min()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coco_style_lines() -> Result<()> {
        let table = LabelTable::parse("0  person\n1 bicycle\n\n51  banana \n76 teddy bear\n")?;
        assert_eq!(table.len(), 4);
        assert_eq!(table.name(51), Some("banana"));
        assert_eq!(table.name(76), Some("teddy bear"));
        assert_eq!(table.id_of("banana"), Some(51));
        assert_eq!(table.id_of("zebra"), None);
        Ok(())
    }

    #[test]
    fn rejects_malformed_lines() {
        let err = LabelTable::parse("0 person\nbanana\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(LabelTable::parse("x person\n").is_err());
    }
}
