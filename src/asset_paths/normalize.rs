use crate::asset_paths::IgnoreRules;
use crate::config::NormalizerConfig;

/// Turns arbitrary caller paths into the address space the manifest was built with.
///
/// Packaging descriptions store shallow relative addresses, so only the last two path
/// segments are kept. Source data files (`JSON/*.json` by default) are pre-compiled into
/// packaged objects before bundling; callers still ask for them by their original location
/// and are redirected to the packaged counterpart.
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    ignore: IgnoreRules,
    source_extension: String,
    source_dir: String,
    packaged_dir: String,
    packaged_extension: String,
}

impl PathNormalizer {
    /// Build a normaliser from its configuration.
    pub fn new(config: &NormalizerConfig) -> Self {
        Self {
            ignore: IgnoreRules::new(&config.ignored_patterns),
            source_extension: config.source_extension.clone(),
            source_dir: config.source_dir.clone(),
            packaged_dir: config.packaged_dir.clone(),
            packaged_extension: config.packaged_extension.clone(),
        }
    }

    /// Normalise `raw_path` into an address.
    ///
    /// An empty string means the path can never resolve and must not be queried.
    pub fn normalize(&self, raw_path: &str) -> String {
        if raw_path.is_empty() || self.ignore.is_ignored(raw_path) {
            return String::new();
        }

        let unified = raw_path.replace('\\', "/");
        let relative = last_two_segments(&unified);

        let (dir, name) = match relative.rsplit_once('/') {
            Some((dir, name)) => (dir, name),
            None => ("", relative),
        };

        match name.rsplit_once('.') {
            Some((stem, extension)) if extension == self.source_extension => {
                self.packaged_address(dir, stem)
            }
            _ => relative.to_string(),
        }
    }

    fn packaged_address(&self, dir: &str, stem: &str) -> String {
        let file = format!("{stem}.{}", self.packaged_extension);
        if dir.is_empty() {
            return file;
        }

        let dir = dir
            .split('/')
            .map(|segment| {
                if segment == self.source_dir {
                    self.packaged_dir.as_str()
                } else {
                    segment
                }
            })
            .collect::<Vec<_>>()
            .join("/");
        format!("{dir}/{file}")
    }
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

/// Everything after the second-to-last `/`, or the whole path when it has fewer separators.
fn last_two_segments(path: &str) -> &str {
    let Some(last) = path.rfind('/') else {
        return path;
    };
    let start = path[..last].rfind('/').map_or(0, |index| index + 1);
    &path[start..]
}
