#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use polgen_core::types::ImageInfo;
use polgen_engine::catalog::CatalogLoader;

#[derive(Debug, Arbitrary)]
struct MatchInput {
    precondition: String,
    files: Vec<String>,
    tags: Vec<String>,
}

fuzz_target!(|input: MatchInput| {
    let yaml = format!(
        "version: 1.0.0\nrules:\n  - name: fuzz\n    precondition: [{:?}]\n    spec:\n      severity: 1\n      network:\n        matchProtocols:\n          - protocol: raw\n",
        input.precondition
    );
    let Ok(catalog) = CatalogLoader::load_str(&yaml, "fuzz-input.yaml") else {
        return;
    };

    let image = ImageInfo {
        file_list: input.files.into_iter().collect(),
        ..ImageInfo::default()
    };
    for spec in &catalog {
        let _ = spec.matches(&image, &input.tags);
        let _ = spec.hits(&image);
    }
});
