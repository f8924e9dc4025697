pub use crate::config::*;

/// A builder for assembling the ballots of an election.
///
/// ```
/// pub use chamber_voting::builder::Builder;
/// pub use chamber_voting::ElectionRules;
/// # use chamber_voting::ElectionErrors;
///
/// let mut builder = Builder::new(&ElectionRules::DEFAULT_RULES)?
///     .candidates(&["Anna".to_string(), "Bob".to_string()])?;
///
/// builder.add_ballot("member-001", &["Anna".to_string(), "Bob".to_string()])?;
/// builder.add_ballot("member-002", &["Anna".to_string()])?;
///
/// let result = builder.run()?;
/// assert_eq!(result.winners[0].name, "Anna");
///
/// # Ok::<(), ElectionErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: ElectionRules,
    pub(crate) _candidates: Vec<Candidate>,
    pub(crate) _ballots: Vec<Ballot>,
}

impl Builder {
    pub fn new(rules: &ElectionRules) -> Result<Builder, ElectionErrors> {
        Ok(Builder {
            _rules: rules.clone(),
            _candidates: Vec::new(),
            _ballots: Vec::new(),
        })
    }

    pub fn candidates(self, names: &[String]) -> Result<Builder, ElectionErrors> {
        Ok(Builder {
            _rules: self._rules,
            _candidates: names
                .iter()
                .map(|name| Candidate {
                    name: name.clone(),
                    code: None,
                })
                .collect(),
            _ballots: Vec::new(),
        })
    }

    /// Adds the ballot of one voter, choices in preference order.
    ///
    /// Names are checked against the declared candidates when the election
    /// runs, not here.
    pub fn add_ballot(&mut self, voter: &str, choices: &[String]) -> Result<(), ElectionErrors> {
        self.add_weighted_ballot(Some(voter), choices, 1)
    }

    /// Adds a pre-aggregated ballot standing for `count` identical votes.
    pub fn add_weighted_ballot(
        &mut self,
        voter: Option<&str>,
        choices: &[String],
        count: u64,
    ) -> Result<(), ElectionErrors> {
        self._ballots.push(Ballot {
            voter: voter.map(|v| v.to_string()),
            choices: choices.to_vec(),
            count,
        });
        Ok(())
    }

    /// Resolves the election with the accumulated ballots.
    pub fn run(&self) -> Result<ElectionResult, ElectionErrors> {
        crate::run_election(&self._ballots, &self._rules, &self._candidates)
    }
}
