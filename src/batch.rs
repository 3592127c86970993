//! Concurrent processing of several input files against one handler.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{info, warn};
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::inference::response::STATUS_ERROR;
use crate::inference::{InferenceHandler, Response};

/// Response for one input file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub response: Response,
}

impl FileOutcome {
    /// One JSON object: input path and status, followed by the response body.
    pub fn to_json(&self) -> Value {
        let mut line = Map::new();
        line.insert("input".into(), json!(self.input.display().to_string()));
        line.insert("status".into(), json!(self.response.status));
        if let Value::Object(body) = &self.response.body {
            line.extend(body.clone());
        }
        Value::Object(line)
    }
}

fn read_input(path: &Path) -> std::io::Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin().lock().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read(path)
    }
}

fn process_file(handler: &InferenceHandler, config: &Config, path: &Path) -> FileOutcome {
    let response = match read_input(path) {
        Ok(bytes) => {
            let format = config.format_for(path, &bytes);
            handler.respond(&bytes, Some(format))
        }
        Err(e) => {
            warn!("Could not read {}: {e}", path.display());
            Response {
                status: STATUS_ERROR,
                body: json!({
                    "error": format!("could not read input: {e}"),
                    "kind": "input_unreadable",
                }),
            }
        }
    };
    FileOutcome {
        input: path.to_path_buf(),
        response,
    }
}

/// Run every configured input through `handler`, using up to `config.jobs`
/// worker threads. Outcomes come back in input order.
pub fn run_batch(handler: &InferenceHandler, config: &Config) -> Vec<FileOutcome> {
    let inputs = &config.inputs;
    let workers = config.jobs.clamp(1, inputs.len().max(1));
    info!("Processing {} input(s) with {workers} worker(s)", inputs.len());

    let next = AtomicUsize::new(0);
    let mut outcomes: Vec<(usize, FileOutcome)> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    let mut done = Vec::new();
                    loop {
                        let idx = next.fetch_add(1, Ordering::Relaxed);
                        let Some(path) = inputs.get(idx) else { break };
                        done.push((idx, process_file(handler, config, path)));
                    }
                    done
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|worker| worker.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });

    outcomes.sort_unstable_by_key(|(idx, _)| *idx);
    assert_eq!(outcomes.len(), inputs.len(), "every input yields one outcome");
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::inference::SchemaPolicy;
    use crate::model::{ForestClassifier, Label, TreeNode};

    fn handler() -> InferenceHandler {
        let model = ForestClassifier::new(
            vec!["feature1".into(), "feature2".into()],
            vec![Label::Int(0), Label::Int(1)],
            vec![TreeNode::split(0, 50.0, TreeNode::leaf(0), TreeNode::leaf(1))],
        )
        .unwrap();
        InferenceHandler::new(Arc::new(model))
    }

    fn config(inputs: Vec<PathBuf>, jobs: usize) -> Config {
        Config {
            model_path: PathBuf::from("unused.json"),
            format: None,
            policy: SchemaPolicy::Lenient,
            jobs,
            inputs,
        }
    }

    #[test]
    fn outcomes_keep_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut inputs = Vec::new();
        for i in 0..6 {
            let path = dir.path().join(format!("in{i}.csv"));
            let value = if i % 2 == 0 { 10 } else { 90 };
            std::fs::write(&path, format!("feature1,feature2\n{value},0\n")).unwrap();
            inputs.push(path);
        }
        let outcomes = run_batch(&handler(), &config(inputs.clone(), 3));
        assert_eq!(outcomes.len(), 6);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.input, inputs[i]);
            let expected = if i % 2 == 0 { 0 } else { 1 };
            assert_eq!(outcome.response.body, json!({ "predictions": [expected] }));
        }
    }

    #[test]
    fn every_input_yields_one_outcome_at_any_worker_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.csv");
        std::fs::write(&path, "feature1,feature2\n10,0\n").unwrap();
        let inputs = vec![path; 5];
        for jobs in [1, 2, 5, 16] {
            let outcomes = run_batch(&handler(), &config(inputs.clone(), jobs));
            assert_eq!(outcomes.len(), inputs.len(), "jobs = {jobs}");
            assert!(outcomes.iter().all(|o| o.response.is_success()));
        }
    }

    #[test]
    fn unreadable_input_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.csv");
        std::fs::write(&good, "feature1,feature2\n1,2\n").unwrap();
        let missing = dir.path().join("missing.csv");

        let outcomes = run_batch(&handler(), &config(vec![missing, good], 2));
        assert_eq!(outcomes[0].response.status, 500);
        assert_eq!(outcomes[0].response.body["kind"], "input_unreadable");
        assert!(outcomes[1].response.is_success());
    }

    #[test]
    fn json_line_merges_body() {
        let outcome = FileOutcome {
            input: PathBuf::from("a.csv"),
            response: Response {
                status: 200,
                body: json!({ "predictions": [1] }),
            },
        };
        assert_eq!(
            outcome.to_json(),
            json!({ "input": "a.csv", "status": 200, "predictions": [1] })
        );
    }
}
