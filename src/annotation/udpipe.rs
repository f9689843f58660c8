//! UDPipe-backed annotator.
//!
//! Runs the `udpipe` executable once per document:
//!
//! ```text
//! udpipe --tokenize --tag --parse <model> < text > conllu
//! ```
//!
//! and parses its CoNLL-U output. Documents are spread over a bounded pool of
//! worker threads, each driving its own child process.
//!
//! Every process loads the model, so the model is read once per document
//! rather than once per run. Raw text on udpipe's stdin has no document
//! boundaries, and the CoNLL-U output could not be split back into
//! documents, so documents are not batched into a single process. At most
//! `parallelism` processes (and model copies) are alive at a time.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use log::{debug, info};

use crate::annotation::annotator::{AnnotationInput, AnnotationRow, Annotator, annotate_in_pool};
use crate::annotation::conllu::parse_conllu;
use crate::error::{AktstkError, Result};

/// An annotator that shells out to UDPipe.
#[derive(Debug, Clone)]
pub struct UdpipeAnnotator {
    /// Path or name of the udpipe executable.
    binary: PathBuf,
    /// Trained UDPipe model file.
    model: PathBuf,
    /// Extra arguments placed before the model path.
    extra_args: Vec<String>,
}

impl UdpipeAnnotator {
    /// Create an annotator for `model`, using `binary` to run it.
    ///
    /// Fails if the model file does not exist; the binary is only resolved
    /// when the first document is annotated.
    pub fn new<B: Into<PathBuf>, M: Into<PathBuf>>(binary: B, model: M) -> Result<Self> {
        let model = model.into();
        if !model.is_file() {
            return Err(AktstkError::annotation(format!(
                "UDPipe model not found: {}",
                model.display()
            )));
        }

        Ok(UdpipeAnnotator {
            binary: binary.into(),
            model,
            extra_args: Vec::new(),
        })
    }

    /// Pass additional options to udpipe (e.g. `--tokenizer=presegmented`).
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn model(&self) -> &Path {
        &self.model
    }

    fn annotate_document(&self, input: &AnnotationInput) -> Result<Vec<AnnotationRow>> {
        let mut child = Command::new(&self.binary)
            .args(["--tokenize", "--tag", "--parse"])
            .args(&self.extra_args)
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AktstkError::annotation(format!(
                    "Failed to start {}: {e}",
                    self.binary.display()
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AktstkError::annotation("udpipe stdin is not available"))?;

        // Feed stdin from a separate thread so a large stdout cannot block us.
        let (output, written) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(input.text.as_bytes()));
            let output = child.wait_with_output();
            let written = writer
                .join()
                .map_err(|_| AktstkError::annotation("stdin writer panicked"))?;
            Ok::<_, AktstkError>((output?, written))
        })?;

        // Exit status takes precedence over a broken stdin pipe.
        if !output.status.success() {
            return Err(AktstkError::annotation(format!(
                "udpipe failed on document {} ({}): {}",
                input.doc_id,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        written?;

        let conllu = String::from_utf8(output.stdout).map_err(|e| {
            AktstkError::annotation(format!(
                "udpipe produced invalid UTF-8 for document {}: {e}",
                input.doc_id
            ))
        })?;

        let rows = parse_conllu(input.doc_id, &conllu)?;
        debug!("Document {}: {} tokens", input.doc_id, rows.len());
        Ok(rows)
    }
}

impl Annotator for UdpipeAnnotator {
    fn annotate_batch(
        &self,
        batch: &[AnnotationInput],
        parallelism: usize,
    ) -> Result<Vec<AnnotationRow>> {
        info!(
            "Annotating {} documents with {} ({} workers)",
            batch.len(),
            self.model.display(),
            parallelism
        );
        let start = Instant::now();

        let rows = annotate_in_pool(batch, parallelism, |input| self.annotate_document(input))?;

        info!(
            "Annotated {} tokens in {:.2}s",
            rows.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(rows)
    }

    fn name(&self) -> &str {
        "udpipe"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_rejected() {
        let result = UdpipeAnnotator::new("udpipe", "/nonexistent/danish.udpipe");
        assert!(matches!(result, Err(AktstkError::Annotation(_))));
    }

    #[test]
    fn test_missing_binary_fails_batch() {
        let model = tempfile::NamedTempFile::new().unwrap();
        let annotator =
            UdpipeAnnotator::new("/nonexistent/bin/udpipe-does-not-exist", model.path()).unwrap();

        let result = annotator.annotate_batch(&[AnnotationInput::new(1, "Hus")], 1);
        assert!(matches!(result, Err(AktstkError::Annotation(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_annotates_with_external_tool() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.udpipe");
        fs::write(&model, b"model").unwrap();

        // Echoes its input back as a single NOUN token.
        let script = dir.path().join("fake-udpipe");
        fs::write(
            &script,
            "#!/bin/sh\ntext=$(cat)\nprintf '# newpar\\n1\\t%s\\t%s\\tNOUN\\t_\\t_\\t0\\troot\\t_\\t_\\n\\n' \"$text\" \"$text\"\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let annotator = UdpipeAnnotator::new(&script, &model).unwrap();
        let batch = vec![
            AnnotationInput::new(2, "Skib"),
            AnnotationInput::new(1, "Hus"),
        ];

        let rows = annotator.annotate_batch(&batch, 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].doc_id, 1);
        assert_eq!(rows[0].token, "Hus");
        assert_eq!(rows[1].doc_id, 2);
        assert_eq!(rows[1].lemma, "Skib");
    }

    #[cfg(unix)]
    #[test]
    fn test_one_process_per_document() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.udpipe");
        fs::write(&model, b"model").unwrap();
        let calls = dir.path().join("calls.log");

        // Records each invocation and its model argument.
        let script = dir.path().join("fake-udpipe");
        fs::write(
            &script,
            format!(
                "#!/bin/sh\nfor last; do :; done\necho \"$last\" >> '{}'\ntext=$(cat)\nprintf '1\\t%s\\t%s\\tNOUN\\t_\\t_\\t0\\troot\\t_\\t_\\n\\n' \"$text\" \"$text\"\n",
                calls.display()
            ),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let annotator = UdpipeAnnotator::new(&script, &model).unwrap();
        let batch: Vec<_> = (1..=3)
            .map(|id| AnnotationInput::new(id, format!("Ord{id}")))
            .collect();

        let rows = annotator.annotate_batch(&batch, 2).unwrap();
        assert_eq!(rows.len(), 3);

        let log = fs::read_to_string(&calls).unwrap();
        let models: Vec<&str> = log.lines().collect();
        assert_eq!(models.len(), 3);
        assert!(models.iter().all(|m| *m == model.display().to_string()));
    }
}
