use std::collections::BTreeMap;

use serde::{ Serialize, Deserialize };


/// Name of a random choice inside a generative function.

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
  pub name: String,
  pub index: Option<usize>,
}

impl Address {
  pub fn new(name: &str) -> Self {
    Self { name: name.to_string(), index: None }
  }

  /// Address of the `index`-th choice in a family, like `("y", i)`.

  pub fn indexed(name: &str, index: usize) -> Self {
    Self { name: name.to_string(), index: Some(index) }
  }
}

impl std::fmt::Display for Address {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    match self.index {
      Some(index) => write!(f, "{}[{index}]", self.name),
      None => write!(f, "{}", self.name),
    }
  }
}


/// Ordered mapping from [addresses](Address) to discrete choice values.
///
/// Used both to record what a trace sampled and to constrain
/// what a call to [generate](super::GenerativeFunction::generate) must produce.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(Address, usize)>", into = "Vec<(Address, usize)>")]
pub struct ChoiceMap {
  choices: BTreeMap<Address, usize>,
}

impl ChoiceMap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&mut self, address: Address, value: usize) {
    self.choices.insert(address, value);
  }

  pub fn get(&self, address: &Address) -> Option<usize> {
    self.choices.get(address).copied()
  }

  pub fn has_value(&self, address: &Address) -> bool {
    self.choices.contains_key(address)
  }

  pub fn len(&self) -> usize {
    self.choices.len()
  }

  pub fn is_empty(&self) -> bool {
    self.choices.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&Address, usize)> {
    self.choices.iter().map(|(address, &value)| (address, value) )
  }

  /// Copy all entries of `other` into this map, overwriting existing addresses.

  pub fn extend(&mut self, other: &ChoiceMap) {
    self.choices.extend(other.iter().map(|(address, value)| (address.clone(), value) ));
  }
}

impl FromIterator<(Address, usize)> for ChoiceMap {
  fn from_iter<I: IntoIterator<Item = (Address, usize)>>(iter: I) -> Self {
    Self { choices: iter.into_iter().collect() }
  }
}

impl From<Vec<(Address, usize)>> for ChoiceMap {
  fn from(entries: Vec<(Address, usize)>) -> Self {
    entries.into_iter().collect()
  }
}

impl From<ChoiceMap> for Vec<(Address, usize)> {
  fn from(map: ChoiceMap) -> Self {
    map.choices.into_iter().collect()
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn set_and_get() {
    let mut choices = ChoiceMap::new();
    choices.set(Address::indexed("y", 1), 7);
    choices.set(Address::indexed("y", 0), 3);
    assert_eq!(choices.get(&Address::indexed("y", 1)), Some(7));
    assert!(!choices.has_value(&Address::indexed("y", 2)));
    assert!(!choices.has_value(&Address::new("y")));
    let order: Vec<_> = choices.iter().map(|(a, _)| a.index ).collect();
    assert_eq!(order, vec![Some(0), Some(1)]);
  }

  #[test]
  fn extend_overwrites() {
    let mut a: ChoiceMap = vec![(Address::indexed("y", 0), 1)].into();
    let b: ChoiceMap = vec![(Address::indexed("y", 0), 2), (Address::indexed("y", 1), 5)].into();
    a.extend(&b);
    assert_eq!(a.len(), 2);
    assert_eq!(a.get(&Address::indexed("y", 0)), Some(2));
  }

  #[test]
  fn json() {
    let choices: ChoiceMap = (0..3).map(|i| (Address::indexed("y", i), i * 2) ).collect();
    let json = serde_json::to_string(&choices).unwrap();
    let back: ChoiceMap = serde_json::from_str(&json).unwrap();
    assert_eq!(back, choices);
  }

  #[test]
  fn display() {
    assert_eq!(Address::indexed("y", 4).to_string(), "y[4]");
    assert_eq!(Address::new("x").to_string(), "x");
  }
}
