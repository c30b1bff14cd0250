mod support;

use adgen::config::ConfigError;
use adgen::engine::{classify_node, JobTemplate, NodeRole, PatchParams, TemplateError};
use serde_json::json;
use std::fs;
use support::sample_template;
use tempfile::tempdir;

fn params<'a>(prompt: &'a str, negative: Option<&'a str>, seed: Option<u64>) -> PatchParams<'a> {
    PatchParams {
        run_id: "r1",
        prompt,
        negative_prompt: negative,
        seed,
    }
}

#[test]
fn template_patch_sets_prompt_prefix_and_seed() {
    let template = JobTemplate::from_value(sample_template()).expect("template");
    let graph = template
        .patch(&params("a red ball on grass", Some("lowres"), Some(42)))
        .expect("patch");

    assert_eq!(graph["6"]["inputs"]["text"], "a red ball on grass");
    assert_eq!(graph["7"]["inputs"]["text"], "lowres");
    assert_eq!(graph["9"]["inputs"]["filename_prefix"], "r1");
    assert_eq!(graph["3"]["inputs"]["seed"], 42);
    assert_eq!(graph["3"]["inputs"]["steps"], 20);
    assert_eq!(graph["6"]["inputs"]["clip"], json!(["4", 1]));
}

#[test]
fn template_patch_leaves_negative_and_seed_alone_when_not_given() {
    let template = JobTemplate::from_value(sample_template()).expect("template");
    let graph = template
        .patch(&params("a red ball", None, None))
        .expect("patch");

    assert_eq!(graph["7"]["inputs"]["text"], "blurry");
    assert_eq!(graph["3"]["inputs"]["seed"], 1);
}

#[test]
fn template_patch_never_mutates_the_loaded_template() {
    let template = JobTemplate::from_value(sample_template()).expect("template");
    let first = template.patch(&params("first", None, Some(7))).expect("patch");
    let second = template.patch(&params("second", None, None)).expect("patch");

    assert_eq!(first["6"]["inputs"]["text"], "first");
    assert_eq!(second["6"]["inputs"]["text"], "second");
    assert_eq!(second["3"]["inputs"]["seed"], 1);
    assert_eq!(template.nodes()["6"]["inputs"]["text"], "placeholder");
    assert_eq!(template.nodes()["9"]["inputs"]["filename_prefix"], "ComfyUI");
}

#[test]
fn template_patch_writes_prompt_field_and_noise_seed_variants() {
    let template = JobTemplate::from_value(json!({
        "positive": {"class_type": "TextEncodeQwen", "inputs": {"prompt": ""}},
        "sampler": {"class_type": "SamplerCustom", "inputs": {"noise_seed": 0}},
        "save": {"class_type": "SaveAnimatedWEBP", "inputs": {}}
    }))
    .expect("template");

    let graph = template.patch(&params("hello", None, Some(9))).expect("patch");
    assert_eq!(graph["positive"]["inputs"]["prompt"], "hello");
    assert!(graph["positive"]["inputs"].get("text").is_none());
    assert_eq!(graph["sampler"]["inputs"]["noise_seed"], 9);
    assert!(graph["sampler"]["inputs"].get("seed").is_none());
    assert_eq!(graph["save"]["inputs"]["filename_prefix"], "r1");
}

#[test]
fn template_without_positive_text_or_output_is_rejected() {
    let no_positive = JobTemplate::from_value(json!({
        "7": {"class_type": "CLIPTextEncode", "inputs": {"text": ""}, "_meta": {"title": "Negative"}},
        "9": {"class_type": "SaveImage", "inputs": {}}
    }))
    .expect_err("missing positive");
    assert!(matches!(no_positive, TemplateError::MissingNodeRole { .. }));
    assert!(no_positive.to_string().contains("positive"));

    let no_output = JobTemplate::from_value(json!({
        "6": {"class_type": "CLIPTextEncode", "inputs": {"text": ""}}
    }))
    .expect_err("missing output");
    assert!(no_output.to_string().contains("output"));

    let not_object = JobTemplate::from_value(json!(["6"])).expect_err("not an object");
    assert!(matches!(not_object, TemplateError::MalformedNode { .. }));
}

#[test]
fn template_classification_uses_title_and_node_id() {
    let encode = |title: &str| json!({"class_type": "CLIPTextEncode", "_meta": {"title": title}});
    assert_eq!(classify_node("6", &encode("Prompt")), NodeRole::PositiveText);
    assert_eq!(classify_node("7", &encode("NEGATIVE prompt")), NodeRole::NegativeText);
    assert_eq!(
        classify_node("negative_text", &json!({"class_type": "CLIPTextEncode"})),
        NodeRole::NegativeText
    );
    assert_eq!(
        classify_node("3", &json!({"class_type": "KSampler", "inputs": {"steps": 4}})),
        NodeRole::Other
    );
    assert_eq!(
        classify_node("8", &json!({"class_type": "VAEDecode"})),
        NodeRole::Other
    );
}

#[test]
fn template_load_reports_missing_and_invalid_files() {
    let temp = tempdir().expect("tempdir");

    let missing = JobTemplate::load(&temp.path().join("absent.json")).expect_err("missing");
    assert!(matches!(missing, ConfigError::TemplateRead { .. }));

    let garbled = temp.path().join("garbled.json");
    fs::write(&garbled, "{not json").expect("write");
    let err = JobTemplate::load(&garbled).expect_err("garbled");
    assert!(matches!(err, ConfigError::TemplateParse { .. }));

    let unusable = temp.path().join("unusable.json");
    fs::write(&unusable, r#"{"1": {"class_type": "VAEDecode"}}"#).expect("write");
    let err = JobTemplate::load(&unusable).expect_err("unusable");
    assert!(matches!(err, ConfigError::TemplateInvalid { .. }));

    let good = temp.path().join("graph.json");
    fs::write(&good, sample_template().to_string()).expect("write");
    let template = JobTemplate::load(&good).expect("load");
    assert_eq!(template.nodes().len(), 4);
}
