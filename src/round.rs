//! A single round: optional communication, choices, scoring.

use tracing::{debug, info, trace};

use crate::agent::Agent;
use crate::config::Strategies;
use crate::error::{GameError, Result};
use crate::history::{render_transcript, Choice, GameHistory, Message, RoundRecord};
use crate::payoff::PayoffRule;
use crate::prompt::{Phase, PromptContext, PromptRenderer};

/// Progress of a [`GameRound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Nothing asked yet
    NotStarted,
    /// Agents are exchanging messages
    Communicating,
    /// Agents are picking strategies
    Choosing,
    /// Payoffs attributed
    Scored,
    /// Recorded in the history
    Complete,
}

/// Round-independent parameters.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RoundSettings {
    pub communicate: bool,
    pub n_rounds: Option<u32>,
}

/// Executes one round for all agents, in roster order.
///
/// Every agent sees the same history, plus the messages already sent in this round when
/// agents communicate. A round is played once; it then only serves as a read-only view.
pub struct GameRound<'g> {
    number: u32,
    phase: RoundPhase,
    settings: RoundSettings,
    agents: &'g mut [Agent],
    history: &'g mut GameHistory,
    payoff: &'g dyn PayoffRule,
    renderer: &'g dyn PromptRenderer,
    transcript: Vec<Message>,
    choices: Vec<Choice>,
}

impl<'g> GameRound<'g> {
    pub(crate) fn new(
        number: u32,
        settings: RoundSettings,
        agents: &'g mut [Agent],
        history: &'g mut GameHistory,
        payoff: &'g dyn PayoffRule,
        renderer: &'g dyn PromptRenderer,
    ) -> Self {
        Self {
            number,
            phase: RoundPhase::NotStarted,
            settings,
            agents,
            history,
            payoff,
            renderer,
            transcript: vec![],
            choices: vec![],
        }
    }

    /// Round number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Current phase.
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    fn enter(&mut self, phase: RoundPhase) {
        trace!(round = self.number, from = ?self.phase, to = ?phase, "round phase");
        self.phase = phase;
    }

    /// Run every phase and return the record appended to the history.
    ///
    /// Consumes the round, so it is played at most once.
    ///
    /// # Errors
    /// Connector failures, [`GameError::UnparsableChoice`] and payoff errors. Nothing is recorded
    /// when the round fails.
    pub(crate) fn play(mut self) -> Result<&'g RoundRecord> {
        if self.settings.communicate {
            self.communicate()?;
        }
        self.choose()?;
        let record = self.score()?;
        self.enter(RoundPhase::Complete);
        let history = self.history;
        Ok(history.append(record))
    }

    fn communicate(&mut self) -> Result<()> {
        self.enter(RoundPhase::Communicating);
        for index in 0..self.agents.len() {
            let prompt = self.prompt(index, Phase::Communicate);
            let agent = &mut self.agents[index];
            let text = agent.ask(&prompt)?;
            debug!(round = self.number, agent = agent.name(), %text, "message");
            self.transcript.push(Message {
                agent: agent.name().to_string(),
                text,
            });
        }
        Ok(())
    }

    fn choose(&mut self) -> Result<()> {
        self.enter(RoundPhase::Choosing);
        for index in 0..self.agents.len() {
            let prompt = self.prompt(index, Phase::Choose);
            let agent = &mut self.agents[index];
            let reply = agent.ask(&prompt)?;
            let strategy = parse_choice(&reply, self.payoff.strategies()).ok_or_else(|| {
                GameError::UnparsableChoice {
                    agent: agent.name().to_string(),
                    reply: reply.clone(),
                }
            })?;
            debug!(round = self.number, agent = agent.name(), %strategy, "choice");
            self.choices.push(Choice {
                agent: agent.name().to_string(),
                strategy,
            });
        }
        Ok(())
    }

    fn score(&mut self) -> Result<RoundRecord> {
        let keys = self
            .choices
            .iter()
            .map(|c| c.strategy.clone())
            .collect::<Vec<_>>();
        // key first: a table miss must not leave partial scores behind
        let combination_key = self.payoff.combination_key(&keys)?;
        let payoffs = self.payoff.attribute_scores(&mut *self.agents, &keys)?;
        self.enter(RoundPhase::Scored);
        info!(round = self.number, %combination_key, ?payoffs, "round scored");

        Ok(RoundRecord {
            round: self.number,
            choices: std::mem::take(&mut self.choices),
            transcript: self
                .settings
                .communicate
                .then(|| std::mem::take(&mut self.transcript)),
            payoffs,
            combination_key,
        })
    }

    fn prompt(&self, index: usize, phase: Phase) -> String {
        let agent = &self.agents[index];
        let context = PromptContext {
            agent_name: agent.name(),
            persona: agent.persona(),
            opponents: self
                .agents
                .iter()
                .filter(|other| other.name() != agent.name())
                .map(Agent::name)
                .collect(),
            current_round: self.number,
            n_rounds: self.settings.n_rounds,
            history: self.history.render(self.payoff.strategies()),
            messages: render_transcript(&self.transcript),
            phase,
            strategies: self.payoff.strategies(),
            extra: self.payoff.prompt_values(),
        };
        self.renderer.render(&context)
    }
}

/// Words that, right before a mentioned label, turn it into a refusal.
const NEGATIONS: &[&str] = &[
    "not", "never", "no", "don't", "don\u{2019}t", "won't", "won\u{2019}t", "cannot", "can't",
    "ne", "pas", "jamais",
];

/// Map a free-text reply to a strategy key.
///
/// Code fences, surrounding quotes and trailing punctuation are ignored. A reply equal to a
/// label (or a key) wins, case-insensitively. Otherwise the reply must mention exactly one
/// label; a label that only appears inside a longer mentioned label does not count.
///
/// Matching is lexical. A mention directly preceded by a negation (`I will not contribute`) is
/// rejected rather than read as a choice, but negations further away from the label are not
/// detected.
pub fn parse_choice(reply: &str, strategies: &Strategies) -> Option<String> {
    let cleaned = strip_code_blocks(reply)
        .trim_matches(|c: char| c.is_whitespace() || "\"'`*.!".contains(c));

    if let Some(key) = strategies.key_for_label(cleaned) {
        return Some(key.to_string());
    }
    if let Some(strategy) = strategies
        .iter()
        .find(|s| s.key.eq_ignore_ascii_case(cleaned))
    {
        return Some(strategy.key.clone());
    }

    let lowered = cleaned.to_lowercase();
    let mentioned = strategies
        .iter()
        .filter(|s| lowered.contains(&s.label.to_lowercase()))
        .collect::<Vec<_>>();
    let outermost = mentioned
        .iter()
        .filter(|s| {
            let label = s.label.to_lowercase();
            !mentioned.iter().any(|other| {
                let other = other.label.to_lowercase();
                other.len() > label.len() && other.contains(&label)
            })
        })
        .collect::<Vec<_>>();

    match outermost.as_slice() {
        [only] if !negated(&lowered, &only.label.to_lowercase()) => Some(only.key.clone()),
        _ => None,
    }
}

fn negated(reply: &str, label: &str) -> bool {
    reply.match_indices(label).any(|(at, _)| {
        reply[..at]
            .split_whitespace()
            .next_back()
            .is_some_and(|word| NEGATIONS.contains(&word))
    })
}

fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}
