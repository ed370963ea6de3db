use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Overlay {
    Rules,
    NotAllowed,
    BuyPanel,
}

impl Overlay {
    pub const ALL: [Overlay; 3] = [Overlay::Rules, Overlay::NotAllowed, Overlay::BuyPanel];

    fn bit(self) -> u8 {
        match self {
            Overlay::Rules => 1 << 0,
            Overlay::NotAllowed => 1 << 1,
            Overlay::BuyPanel => 1 << 2,
        }
    }
}

impl fmt::Display for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Overlay::Rules => "rules",
            Overlay::NotAllowed => "not-allowed",
            Overlay::BuyPanel => "buy-panel",
        };
        f.write_str(name)
    }
}

/// Open/closed flags for the three overlays. Flags are independent: any
/// combination may be open at once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OverlayVisibility {
    open: u8,
}

impl OverlayVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, overlay: Overlay) {
        if !self.is_open(overlay) {
            tracing::debug!(%overlay, "overlay opened");
        }
        self.open |= overlay.bit();
    }

    pub fn close(&mut self, overlay: Overlay) {
        if self.is_open(overlay) {
            tracing::debug!(%overlay, "overlay closed");
        }
        self.open &= !overlay.bit();
    }

    pub fn toggle(&mut self, overlay: Overlay) {
        if self.is_open(overlay) {
            self.close(overlay);
        } else {
            self.open(overlay);
        }
    }

    pub fn is_open(&self, overlay: Overlay) -> bool {
        self.open & overlay.bit() != 0
    }

    pub fn close_all(&mut self) {
        self.open = 0;
    }

    pub fn any_open(&self) -> bool {
        self.open != 0
    }

    /// Open overlays in a fixed order, lowest first.
    pub fn open_overlays(&self) -> impl Iterator<Item = Overlay> + '_ {
        Overlay::ALL.into_iter().filter(|o| self.is_open(*o))
    }
}
