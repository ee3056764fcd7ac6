//! Export artifact
//!
//! A replay artifact carries the document plus the identity of the kernel
//! that produced it. The player is this same crate compiled to wasm, so an
//! exported page runs exactly the authoring kernel.

use serde::{Deserialize, Serialize};

use crate::consts::KERNEL_VERSION;
use crate::document::Document;
use crate::error::ExportError;
use crate::sim::{BehaviorRegistry, Simulation};

/// Value of the `format` field
pub const ARTIFACT_FORMAT: &str = "sim-sandbox/replay";

/// Element ids the wasm player looks up
pub const DOCUMENT_ELEMENT_ID: &str = "sandbox-document";
pub const CANVAS_ELEMENT_ID: &str = "sandbox-canvas";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub format: String,
    pub kernel_version: String,
    pub document: Document,
}

/// Compiled player supplied by the build (wasm-bindgen `no-modules` output)
#[derive(Debug, Clone)]
pub struct KernelBundle {
    pub loader_js: String,
    pub wasm_base64: String,
}

impl ExportArtifact {
    pub fn new(document: Document) -> Self {
        Self {
            format: ARTIFACT_FORMAT.to_string(),
            kernel_version: KERNEL_VERSION.to_string(),
            document,
        }
    }

    /// Snapshot of a running simulation
    pub fn from_simulation(sim: &Simulation) -> Self {
        Self::new(sim.document())
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and check the envelope. The document is not validated here.
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        let artifact: ExportArtifact = serde_json::from_str(json)?;
        artifact.check_envelope()?;
        Ok(artifact)
    }

    fn check_envelope(&self) -> Result<(), ExportError> {
        if self.format != ARTIFACT_FORMAT {
            return Err(ExportError::Format(self.format.clone()));
        }
        if self.kernel_version != KERNEL_VERSION {
            return Err(ExportError::KernelMismatch {
                found: self.kernel_version.clone(),
                expected: KERNEL_VERSION.to_string(),
            });
        }
        Ok(())
    }

    /// Validate the document and build a simulation ready to replay
    pub fn into_simulation(
        self,
        registry: BehaviorRegistry,
        options: crate::sim::SimOptions,
    ) -> Result<Simulation, ExportError> {
        self.check_envelope()?;
        Ok(Simulation::from_document(self.document, registry, options)?)
    }

    /// Self-contained page: canvas, embedded artifact JSON, loader and wasm
    pub fn to_html(&self, bundle: &KernelBundle, title: &str) -> Result<String, ExportError> {
        if bundle.loader_js.contains("</script") {
            return Err(ExportError::Bundle("loader contains a closing script tag".into()));
        }
        if !bundle
            .wasm_base64
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
        {
            return Err(ExportError::Bundle("wasm payload is not base64".into()));
        }

        // "</" cannot appear inside a script element; "<\/" is the same JSON string
        let json = self.to_json()?.replace("</", "<\\/");
        let canvas = &self.document.canvas;
        log::info!(
            "exporting {} objects ({} bytes of wasm)",
            self.document.objects.len(),
            bundle.wasm_base64.len() / 4 * 3
        );

        Ok(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>html,body{{margin:0;background:#222;}}canvas{{display:block;margin:0 auto;touch-action:none;}}</style>
</head>
<body>
<canvas id="{canvas_id}" width="{width}" height="{height}"></canvas>
<script type="application/json" id="{document_id}">{json}</script>
<script>{loader}</script>
<script>
(function () {{
  const bytes = Uint8Array.from(atob("{wasm}"), (c) => c.charCodeAt(0));
  wasm_bindgen({{ module_or_path: bytes }});
}})();
</script>
</body>
</html>
"#,
            title = escape_html(title),
            canvas_id = CANVAS_ELEMENT_ID,
            width = canvas.width.round() as u32,
            height = canvas.height.round() as u32,
            document_id = DOCUMENT_ELEMENT_ID,
            json = json,
            loader = bundle.loader_js,
            wasm = bundle.wasm_base64,
        ))
    }

    /// Recover the artifact embedded by `to_html`
    pub fn from_html(html: &str) -> Result<Self, ExportError> {
        let marker = format!("id=\"{DOCUMENT_ELEMENT_ID}\">");
        let start = html
            .find(&marker)
            .map(|i| i + marker.len())
            .ok_or_else(|| ExportError::Format("no embedded document".into()))?;
        let len = html[start..]
            .find("</script>")
            .ok_or_else(|| ExportError::Format("unterminated embedded document".into()))?;
        Self::from_json(&html[start..start + len].replace("<\\/", "</"))
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::object::SimObject;
    use glam::Vec2;

    fn bundle() -> KernelBundle {
        KernelBundle {
            loader_js: "var wasm_bindgen = function () {};".into(),
            wasm_base64: "AGFzbQEAAAA=".into(),
        }
    }

    fn artifact() -> ExportArtifact {
        let mut doc = Document::default();
        doc.objects.push(SimObject::text("t", Vec2::new(10.0, 10.0), "a </script> b", 12.0));
        ExportArtifact::new(doc)
    }

    #[test]
    fn test_envelope_checks() {
        let json = artifact().to_json().unwrap();
        assert!(ExportArtifact::from_json(&json).is_ok());

        let mut other = artifact();
        other.kernel_version = "0.0.0-other".into();
        let err = ExportArtifact::from_json(&other.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, ExportError::KernelMismatch { .. }));

        let mut other = artifact();
        other.format = "something-else".into();
        let err = ExportArtifact::from_json(&other.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, ExportError::Format(_)));
    }

    #[test]
    fn test_html_embeds_document_safely() {
        let html = artifact().to_html(&bundle(), "Demo <1>").unwrap();
        assert!(html.contains("<title>Demo &lt;1&gt;</title>"));
        assert!(html.contains(r#"id="sandbox-canvas" width="800" height="600""#));
        assert_eq!(html.matches("</script>").count(), 3);

        let back = ExportArtifact::from_html(&html).unwrap();
        assert_eq!(back.document.objects[0].id, "t");
        assert_eq!(
            back.document.objects[0].shape,
            artifact().document.objects[0].shape
        );
    }

    #[test]
    fn test_bad_bundle_rejected() {
        let mut b = bundle();
        b.loader_js = "</script><script>alert(1)".into();
        assert!(matches!(
            artifact().to_html(&b, "x"),
            Err(ExportError::Bundle(_))
        ));

        let mut b = bundle();
        b.wasm_base64 = "not base64!".into();
        assert!(artifact().to_html(&b, "x").is_err());
    }
}
