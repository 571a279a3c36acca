/// Position held by the trading loop
///
/// At most one position exists at a time. Only the loop changes it, and only
/// after the exchange has acknowledged the order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Holding { quantity: f64 },
}

impl PositionState {
    /// Base asset currently held (0 when flat)
    pub fn quantity(&self) -> f64 {
        match self {
            PositionState::Flat => 0.0,
            PositionState::Holding { quantity } => *quantity,
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    /// Check that a buy of `quantity` could be recorded
    pub fn can_open(&self, quantity: f64) -> anyhow::Result<()> {
        if !self.is_flat() {
            anyhow::bail!("already holding {:.8}", self.quantity());
        }
        if !quantity.is_finite() || quantity <= 0.0 {
            anyhow::bail!("cannot open a position of {:.8}", quantity);
        }
        Ok(())
    }

    /// Record a confirmed buy
    pub fn open(&mut self, quantity: f64) -> anyhow::Result<()> {
        self.can_open(quantity)?;
        *self = PositionState::Holding { quantity };
        Ok(())
    }

    /// Record a confirmed sell of the whole position
    pub fn close(&mut self) -> f64 {
        let quantity = self.quantity();
        *self = PositionState::Flat;
        quantity
    }
}
