use sim_sandbox::export::{ExportArtifact, KernelBundle};
use sim_sandbox::sim::{BehaviorRegistry, SimOptions, Simulation, Value};
use sim_sandbox::templates::{BuiltinTemplates, TemplateSource};

fn playground() -> Simulation {
    BuiltinTemplates
        .instantiate("playground", BehaviorRegistry::with_builtins(), SimOptions::default())
        .expect("playground template")
}

fn assert_same_objects(a: &Simulation, b: &Simulation) {
    assert_eq!(a.objects().len(), b.objects().len());
    for (x, y) in a.objects().iter().zip(b.objects()) {
        assert_eq!(x.id, y.id);
        assert_eq!(x.shape.kind_name(), y.shape.kind_name());
        assert_eq!(x.shape, y.shape, "geometry of '{}'", x.id);
        assert_eq!(x.position, y.position, "position of '{}'", x.id);
        assert_eq!(x.params, y.params, "overrides of '{}'", x.id);
        assert_eq!(x.activation, y.activation);
        assert_eq!(x.physics, y.physics);
    }
}

#[test]
fn test_export_round_trip_after_running() {
    let mut sim = playground();
    sim.set_control_value("spin", 45.0);
    sim.set_property("moon", "orbit.speed", &Value::Number(0.5))
        .expect("moon has orbit");
    for _ in 0..90 {
        sim.step(1.0 / 60.0);
    }

    let json = ExportArtifact::from_simulation(&sim).to_json().expect("serialize");
    let reloaded = ExportArtifact::from_json(&json)
        .expect("parse artifact")
        .into_simulation(BehaviorRegistry::with_builtins(), SimOptions::default())
        .expect("valid document");

    assert_same_objects(&sim, &reloaded);
    assert_eq!(
        reloaded.get_property("spinner", "rotate.speed").unwrap(),
        Value::Number(45.0)
    );
    assert_eq!(reloaded.controls().len(), sim.controls().len());
    assert_eq!(reloaded.physics(), sim.physics());
    assert!(reloaded.script_errors().is_empty());
}

#[test]
fn test_html_artifact_replays_same_document() {
    let sim = playground();
    let bundle = KernelBundle {
        loader_js: "let wasm_bindgen = () => {};".into(),
        wasm_base64: "AGFzbQEAAAA=".into(),
    };
    let html = ExportArtifact::from_simulation(&sim)
        .to_html(&bundle, "Playground")
        .expect("html");

    let replay = ExportArtifact::from_html(&html)
        .expect("embedded artifact")
        .into_simulation(BehaviorRegistry::with_builtins(), SimOptions::default())
        .expect("valid document");
    assert_same_objects(&sim, &replay);
}
