//! Walk policies mapping file extensions to ingestion actions.
//!
//! The three scans (level/mod assets, base-data assets, engine executables)
//! share one walker; what differs is the policy: which extensions register
//! directly, into which collection, and where a JSON or text sidecar's
//! fields end up. A [`Classifier`] carries exactly that capability set.
//!
//! Extension matching is case-sensitive on the substring after the final
//! `.`, and files with unrecognized extensions are ignored.

/// Collection of level/mod asset records.
pub const PWADS: &str = "pwads";
/// Collection of base-data asset records.
pub const IWADS: &str = "iwads";
/// Collection of engine executable records.
pub const SOURCEPORTS: &str = "sourceports";
/// Collection of engine configuration records.
pub const SOURCEPORT_CONFIGS: &str = "sourceportConfigs";

/// Where a classifier sends the fields of a parsed JSON sidecar.
#[derive(Debug, Clone, Copy)]
enum JsonRouting {
    /// Always the named collection.
    Fixed(&'static str),
    /// Decided by the extension of the parsed record's own `filename`
    /// field, using the classifier's registration table.
    ByRecordExtension,
}

/// What to do with one visited file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Upsert `{filename, filepath}` into the collection.
    Register { collection: &'static str },
    /// Parse the file as JSON and merge its fields into a routed collection.
    MergeJson,
    /// Merge the file's text into a sibling record's `longDescription`.
    MergeText,
    /// Extension not recognized by this classifier.
    Ignore,
}

/// One walk policy: native extension registrations plus sidecar routing.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    name: &'static str,
    registrations: &'static [(&'static [&'static str], &'static str)],
    json_routing: JsonRouting,
    text_collection: &'static str,
}

impl Classifier {
    /// Level/mod assets: wad, pk3, deh, bex register into `pwads`.
    pub fn level_mods() -> Self {
        Self {
            name: "level-mods",
            registrations: &[(&["wad", "pk3", "deh", "bex"], PWADS)],
            json_routing: JsonRouting::Fixed(PWADS),
            text_collection: PWADS,
        }
    }

    /// Base-data assets: wad, pk3 register into `iwads`.
    pub fn base_data() -> Self {
        Self {
            name: "base-data",
            registrations: &[(&["wad", "pk3"], IWADS)],
            json_routing: JsonRouting::Fixed(IWADS),
            text_collection: IWADS,
        }
    }

    /// Engine executables: exe registers into `sourceports`, ini into
    /// `sourceportConfigs`; JSON sidecars route by the referenced file's
    /// own extension.
    pub fn engines() -> Self {
        Self {
            name: "engines",
            registrations: &[(&["exe"], SOURCEPORTS), (&["ini"], SOURCEPORT_CONFIGS)],
            json_routing: JsonRouting::ByRecordExtension,
            text_collection: SOURCEPORTS,
        }
    }

    /// The policy's name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The collection searched when merging a text sidecar.
    pub fn text_collection(&self) -> &'static str {
        self.text_collection
    }

    /// Decides the ingestion action for a visited filename.
    pub fn classify(&self, file_name: &str) -> Action {
        let Some(ext) = extension(file_name) else {
            return Action::Ignore;
        };
        if let Some(collection) = self.registration_target(ext) {
            return Action::Register { collection };
        }
        match ext {
            "json" => Action::MergeJson,
            "txt" => Action::MergeText,
            _ => Action::Ignore,
        }
    }

    /// Destination collection for a parsed JSON sidecar, given the parsed
    /// record's own `filename`. `None` means the sidecar references a file
    /// this classifier does not catalog.
    pub fn json_target(&self, record_filename: &str) -> Option<&'static str> {
        match self.json_routing {
            JsonRouting::Fixed(collection) => Some(collection),
            JsonRouting::ByRecordExtension => {
                extension(record_filename).and_then(|ext| self.registration_target(ext))
            }
        }
    }

    fn registration_target(&self, ext: &str) -> Option<&'static str> {
        self.registrations
            .iter()
            .find(|(extensions, _)| extensions.contains(&ext))
            .map(|(_, collection)| *collection)
    }
}

/// The substring after the final `.`, if any, with no further rules: a
/// dotfile like `.wad` has extension `wad`, a name ending in `.` has an
/// empty extension (which matches nothing). Case-sensitive by contract.
fn extension(file_name: &str) -> Option<&str> {
    file_name.rsplit_once('.').map(|(_, ext)| ext)
}
