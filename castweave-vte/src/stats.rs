//! Input statistics collected while parsing.
//!
//! The counters answer "what are we dealing with in this capture" questions
//! during review: which states ran, which control functions and sequences
//! appeared, and the complete set of DCS/OSC strings.

use std::collections::{BTreeMap, BTreeSet};

use log::info;

use crate::enums::{Action, State};

#[derive(Debug)]
pub struct Stats {
    states_visited: BTreeMap<State, u64>,
    actions_performed: BTreeMap<Action, u64>,
    control_functions_seen: BTreeMap<u8, u64>,
    escape_sequences_seen: BTreeMap<String, u64>,
    control_sequences_seen: BTreeMap<String, u64>,
    device_control_functions_seen: BTreeMap<String, u64>,
    device_control_strings: BTreeSet<String>,
    os_commands: BTreeSet<String>,
}

impl Default for Stats {
    fn default() -> Self {
        let mut states_visited = BTreeMap::new();
        states_visited.insert(State::Ground, 1);

        Self {
            states_visited,
            actions_performed: BTreeMap::new(),
            control_functions_seen: BTreeMap::new(),
            escape_sequences_seen: BTreeMap::new(),
            control_sequences_seen: BTreeMap::new(),
            device_control_functions_seen: BTreeMap::new(),
            device_control_strings: BTreeSet::new(),
            os_commands: BTreeSet::new(),
        }
    }
}

impl Stats {
    pub(crate) fn state_entered(&mut self, state: State) {
        *self.states_visited.entry(state).or_insert(0) += 1;
    }

    pub(crate) fn action_performed(&mut self, action: Action) {
        *self.actions_performed.entry(action).or_insert(0) += 1;
    }

    pub(crate) fn control_executed(&mut self, byte: u8) {
        *self.control_functions_seen.entry(byte).or_insert(0) += 1;
    }

    pub(crate) fn escape_sequence(&mut self, key: String) {
        *self.escape_sequences_seen.entry(key).or_insert(0) += 1;
    }

    pub(crate) fn control_sequence(&mut self, key: String) {
        *self.control_sequences_seen.entry(key).or_insert(0) += 1;
    }

    pub(crate) fn device_control_function(&mut self, key: String) {
        *self.device_control_functions_seen.entry(key).or_insert(0) += 1;
    }

    pub(crate) fn device_control_string(&mut self, payload: &[u8]) {
        self.device_control_strings
            .insert(String::from_utf8_lossy(payload).into_owned());
    }

    pub(crate) fn os_command(&mut self, payload: &[u8]) {
        self.os_commands
            .insert(String::from_utf8_lossy(payload).into_owned());
    }

    pub fn states_visited(&self) -> &BTreeMap<State, u64> {
        &self.states_visited
    }

    pub fn actions_performed(&self) -> &BTreeMap<Action, u64> {
        &self.actions_performed
    }

    pub fn control_functions_seen(&self) -> &BTreeMap<u8, u64> {
        &self.control_functions_seen
    }

    pub fn escape_sequences_seen(&self) -> &BTreeMap<String, u64> {
        &self.escape_sequences_seen
    }

    pub fn control_sequences_seen(&self) -> &BTreeMap<String, u64> {
        &self.control_sequences_seen
    }

    pub fn os_commands(&self) -> &BTreeSet<String> {
        &self.os_commands
    }

    /// Dump everything collected so far through the `log` facade.
    pub fn log_statistics(&self) {
        info!("-- Visited states:");
        for (state, count) in &self.states_visited {
            info!("{state:?} : {count}");
        }

        info!("-- Executed actions:");
        for (action, count) in &self.actions_performed {
            info!("{action:?} : {count}");
        }

        info!("-- Control functions:");
        for (byte, count) in &self.control_functions_seen {
            info!("{byte:02x} : {count}");
        }

        info!("-- Escape sequences:");
        for (key, count) in &self.escape_sequences_seen {
            info!("{key} : {count}");
        }

        info!("-- Control sequences:");
        for (key, count) in &self.control_sequences_seen {
            info!("{key} : {count}");
        }

        info!("-- Device control functions:");
        for (key, count) in &self.device_control_functions_seen {
            info!("{key} : {count}");
        }

        info!("-- Device control strings:");
        for dcs in &self.device_control_strings {
            info!("   {dcs}");
        }

        info!("-- Operating system commands:");
        for osc in &self.os_commands {
            info!("   {osc}");
        }
    }
}
