//! PyO3 wrapper for the Orchestrator
//!
//! # Example (from Python)
//!
//! ```python
//! import json
//! from market_simulator_core_rs import Simulation
//!
//! config = {
//!     "price_max": 200,
//!     "num_periods": 100,
//!     "steps_per_period": 4000,
//!     "rng_seed": 42,
//!     "initial_asset": 500.0,
//!     "agent_mix": {"zero_intelligence": 1400, "policy": 600},
//! }
//!
//! sim = Simulation(json.dumps(config), oracle=lambda batch: model.predict(batch).tolist())
//! summary = sim.run()
//! print(summary["executions"], summary["fingerprint"])
//! ```

use std::sync::Arc;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::oracle::PyOracle;
use crate::dataset::{generate, DatasetConfig};
use crate::oracle::PolicyOracle;
use crate::orchestrator::{
    Orchestrator as RustOrchestrator, PeriodResult, RunSummary, SimulationConfig, StateSnapshot,
};

fn parse_config(config_json: &str) -> PyResult<SimulationConfig> {
    serde_json::from_str(config_json)
        .map_err(|e| PyValueError::new_err(format!("Invalid simulation config: {}", e)))
}

fn wrap_oracle(oracle: Option<Py<PyAny>>) -> Option<Arc<dyn PolicyOracle>> {
    oracle.map(|callable| Arc::new(PyOracle::new(callable)) as Arc<dyn PolicyOracle>)
}

fn summary_to_py(py: Python, summary: &RunSummary) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("periods_run", summary.periods_run)?;
    dict.set_item("steps_run", summary.steps_run)?;
    dict.set_item("executions", summary.executions)?;
    dict.set_item("fingerprint", &summary.fingerprint)?;

    let breakdown = PyDict::new_bound(py);
    for (kind, counts) in &summary.breakdown {
        let entry = PyDict::new_bound(py);
        entry.set_item("fail", counts.fail)?;
        entry.set_item("buy_overwrite", counts.buy_overwrite)?;
        entry.set_item("buy_executed", counts.buy_executed)?;
        entry.set_item("sell_overwrite", counts.sell_overwrite)?;
        entry.set_item("sell_executed", counts.sell_executed)?;
        breakdown.set_item(kind.label(), entry)?;
    }
    dict.set_item("breakdown", breakdown)?;
    Ok(dict.into())
}

fn period_to_py(py: Python, result: &PeriodResult) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("period", result.period)?;
    dict.set_item("steps", result.steps)?;
    dict.set_item("executions", result.executions)?;
    dict.set_item(
        "exhausted_early",
        result.exhaustion == crate::orchestrator::Exhaustion::AllTraded,
    )?;
    Ok(dict.into())
}

/// Python wrapper for a market run
#[pyclass(name = "Simulation")]
pub struct PySimulation {
    inner: RustOrchestrator,
}

#[pymethods]
impl PySimulation {
    /// Create a run from a JSON config
    ///
    /// Raises ValueError if the config is malformed or invalid (including
    /// policy agents without an oracle).
    #[new]
    #[pyo3(signature = (config_json, oracle=None))]
    fn new(config_json: &str, oracle: Option<Py<PyAny>>) -> PyResult<Self> {
        let config = parse_config(config_json)?;
        let inner = match wrap_oracle(oracle) {
            Some(oracle) => RustOrchestrator::with_oracle(config, oracle),
            None => RustOrchestrator::new(config),
        }
        .map_err(|e| PyValueError::new_err(format!("Failed to create simulation: {}", e)))?;
        Ok(Self { inner })
    }

    /// Rebuild a run from a checkpoint produced by `checkpoint()`
    #[staticmethod]
    #[pyo3(signature = (config_json, snapshot_json, oracle=None))]
    fn restore(config_json: &str, snapshot_json: &str, oracle: Option<Py<PyAny>>) -> PyResult<Self> {
        let config = parse_config(config_json)?;
        let snapshot: StateSnapshot = serde_json::from_str(snapshot_json)
            .map_err(|e| PyValueError::new_err(format!("Invalid snapshot: {}", e)))?;
        let inner = RustOrchestrator::restore(config, snapshot, wrap_oracle(oracle))
            .map_err(|e| PyValueError::new_err(format!("Failed to restore: {}", e)))?;
        Ok(Self { inner })
    }

    /// Run all remaining periods; returns the run summary
    fn run(&mut self, py: Python) -> PyResult<Py<PyDict>> {
        let summary = self
            .inner
            .run()
            .map_err(|e| PyRuntimeError::new_err(format!("Run failed: {}", e)))?;
        summary_to_py(py, &summary)
    }

    /// Run one period; returns its period, steps, executions and early-exit flag
    fn run_period(&mut self, py: Python) -> PyResult<Py<PyDict>> {
        let result = self
            .inner
            .run_period()
            .map_err(|e| PyRuntimeError::new_err(format!("Period failed: {}", e)))?;
        period_to_py(py, &result)
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Trade log as `(period, step, agent_id, kind, role, price, result)` tuples
    fn trade_log(&self) -> Vec<(usize, usize, usize, &'static str, &'static str, u32, &'static str)> {
        self.inner
            .trade_log()
            .records()
            .iter()
            .map(|r| {
                (
                    r.period,
                    r.step,
                    r.agent_id.index(),
                    r.agent_kind.label(),
                    r.role.as_str(),
                    r.price,
                    r.result.as_str(),
                )
            })
            .collect()
    }

    /// `(agent_id, kind, asset)` for every agent, in registry order
    fn agent_assets(&self) -> Vec<(usize, &'static str, f64)> {
        self.inner
            .assets()
            .iter()
            .map(|a| (a.id.index(), a.kind.label(), a.asset))
            .collect()
    }

    fn fingerprint(&self) -> String {
        self.inner.trade_log().fingerprint()
    }

    /// Snapshot at the current period boundary, as JSON
    fn checkpoint(&self) -> PyResult<String> {
        let snapshot = self
            .inner
            .checkpoint()
            .map_err(|e| PyRuntimeError::new_err(format!("Checkpoint failed: {}", e)))?;
        serde_json::to_string(&snapshot)
            .map_err(|e| PyRuntimeError::new_err(format!("Snapshot serialization failed: {}", e)))
    }
}

/// Generate a labelled training set from a JSON dataset config
///
/// Returns `(features, labels)` with labels as class indices 0..4.
#[pyfunction]
pub fn generate_training_data(config_json: &str) -> PyResult<(Vec<Vec<f32>>, Vec<usize>)> {
    let config: DatasetConfig = serde_json::from_str(config_json)
        .map_err(|e| PyValueError::new_err(format!("Invalid dataset config: {}", e)))?;
    let set = generate(&config).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let labels = set.labels.iter().map(|l| l.index()).collect();
    Ok((set.features, labels))
}
