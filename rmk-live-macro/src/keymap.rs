use crate::event::KeyAddr;
use crate::keycode::Key;

/// The active key layout, as seen by the live macro engine.
pub trait Layout {
    /// Key at the given position on the active layer stack
    fn key_on_active_layer(&self, addr: KeyAddr) -> Key;

    /// All key positions of the layout, row by row
    fn key_addrs(&self) -> impl Iterator<Item = KeyAddr>;
}

/// Keymap represents the stack of layers.
///
/// The conception of Keymap in rmk is borrowed from qmk: <https://docs.qmk.fm/#/keymap>.
///
/// Lookup starts at the highest active layer and falls through transparent keys,
/// the lowest checked layer is the default layer.
pub struct KeyMap<'a, const ROW: usize, const COL: usize, const NUM_LAYER: usize> {
    /// Layers
    layers: &'a [[[Key; COL]; ROW]; NUM_LAYER],
    /// Current state of each layer
    layer_state: [bool; NUM_LAYER],
    /// Default layer number
    default_layer: u8,
}

impl<'a, const ROW: usize, const COL: usize, const NUM_LAYER: usize> KeyMap<'a, ROW, COL, NUM_LAYER> {
    pub fn new(layers: &'a [[[Key; COL]; ROW]; NUM_LAYER]) -> Self {
        KeyMap {
            layers,
            layer_state: [false; NUM_LAYER],
            default_layer: 0,
        }
    }

    /// Get the default layer number
    pub fn default_layer(&self) -> u8 {
        self.default_layer
    }

    /// Set the default layer number, returns whether the active layer changed
    pub fn set_default_layer(&mut self, layer_num: u8) -> bool {
        if layer_num as usize >= NUM_LAYER {
            warn!("Not a valid layer {}, keyboard supports only {} layers", layer_num, NUM_LAYER);
            return false;
        }
        self.update(|keymap| keymap.default_layer = layer_num)
    }

    /// The topmost active layer
    pub fn activated_layer(&self) -> u8 {
        for (layer_idx, _) in self.layers.iter().enumerate().rev() {
            if self.layer_state[layer_idx] || layer_idx as u8 == self.default_layer {
                return layer_idx as u8;
            }
        }

        self.default_layer
    }

    /// Activate given layer, returns whether the active layer changed
    pub fn activate_layer(&mut self, layer_num: u8) -> bool {
        if layer_num as usize >= NUM_LAYER {
            warn!("Not a valid layer {}, keyboard supports only {} layers", layer_num, NUM_LAYER);
            return false;
        }
        self.update(|keymap| keymap.layer_state[layer_num as usize] = true)
    }

    /// Deactivate given layer, returns whether the active layer changed
    pub fn deactivate_layer(&mut self, layer_num: u8) -> bool {
        if layer_num as usize >= NUM_LAYER {
            warn!("Not a valid layer {}, keyboard supports only {} layers", layer_num, NUM_LAYER);
            return false;
        }
        self.update(|keymap| keymap.layer_state[layer_num as usize] = false)
    }

    /// Toggle given layer, returns whether the active layer changed
    pub fn toggle_layer(&mut self, layer_num: u8) -> bool {
        if layer_num as usize >= NUM_LAYER {
            warn!("Not a valid layer {}, keyboard supports only {} layers", layer_num, NUM_LAYER);
            return false;
        }
        self.update(|keymap| {
            keymap.layer_state[layer_num as usize] = !keymap.layer_state[layer_num as usize];
        })
    }

    fn update(&mut self, f: impl FnOnce(&mut Self)) -> bool {
        let before = self.activated_layer();
        f(self);
        let after = self.activated_layer();
        if before != after {
            debug!("Active layer changed: {} -> {}", before, after);
        }
        before != after
    }
}

impl<const ROW: usize, const COL: usize, const NUM_LAYER: usize> Layout for KeyMap<'_, ROW, COL, NUM_LAYER> {
    fn key_on_active_layer(&self, addr: KeyAddr) -> Key {
        let row = addr.row as usize;
        let col = addr.col as usize;
        if row >= ROW || col >= COL {
            return Key::NO;
        }

        // Iterate from higher layer to lower layer, the lowest checked layer is the default layer
        for (layer_idx, layer) in self.layers.iter().enumerate().rev() {
            if self.layer_state[layer_idx] || layer_idx as u8 == self.default_layer {
                let key = layer[row][col];
                if key == Key::TRANSPARENT {
                    continue;
                }
                return key;
            }

            if layer_idx as u8 == self.default_layer {
                break;
            }
        }

        Key::NO
    }

    fn key_addrs(&self) -> impl Iterator<Item = KeyAddr> {
        (0..ROW).flat_map(|row| (0..COL).map(move |col| KeyAddr::new(row as u8, col as u8)))
    }
}
