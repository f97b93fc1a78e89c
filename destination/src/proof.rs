/// How eagerly an IN destination proves receipt of packets addressed to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofStrategy {
    /// Never auto-prove; the application decides packet-by-packet.
    ProveNone,
    /// Prove only packets the application explicitly marks for proof.
    ProveApp,
    /// Prove every packet received, including LINKREQUESTs.
    ProveAll,
}

impl ProofStrategy {
    pub fn should_auto_prove(self) -> bool {
        matches!(self, ProofStrategy::ProveAll)
    }
}
